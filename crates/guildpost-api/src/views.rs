use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use guildpost_db::models::{AnnouncementRow, ResponseRow};
use guildpost_types::api::{AnnouncementView, ResponseView};
use guildpost_types::models::ResponseStatus;

/// Parse a SQLite datetime column. SQLite's `datetime('now')` produces
/// "YYYY-MM-DD HH:MM:SS" without a timezone; RFC3339 also appears where
/// we wrote timestamps ourselves.
pub fn parse_datetime(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt datetime '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn parse_id(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub fn announcement_view(row: AnnouncementRow) -> AnnouncementView {
    AnnouncementView {
        id: parse_id(&row.id, "announcement"),
        user_id: parse_id(&row.user_id, "announcement author"),
        author_username: row.author_username,
        title: row.title,
        content: row.content,
        category: row.category,
        image_url: row.image_url,
        created_at: parse_datetime(&row.created_at, "announcement"),
    }
}

pub fn response_view(row: ResponseRow) -> ResponseView {
    let status = row.status.parse::<ResponseStatus>().unwrap_or_else(|_| {
        warn!("Corrupt status '{}' on response '{}'", row.status, row.id);
        ResponseStatus::Pending
    });

    ResponseView {
        id: parse_id(&row.id, "response"),
        announcement_id: parse_id(&row.announcement_id, "response announcement"),
        announcement_title: row.announcement_title,
        user_id: parse_id(&row.user_id, "response author"),
        username: row.username,
        text: row.text,
        status,
        created_at: parse_datetime(&row.created_at, "response"),
    }
}
