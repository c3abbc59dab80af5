use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// The ten fixed role tags announcements can be filed under.
pub const CATEGORY_NAMES: [&str; 10] = [
    "tank",
    "healer",
    "dd",
    "trader",
    "guildmaster",
    "questgiver",
    "blacksmith",
    "leatherworker",
    "alchemist",
    "spellmaster",
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  TEXT PRIMARY KEY,
            username            TEXT NOT NULL UNIQUE,
            password            TEXT NOT NULL,
            email               TEXT NOT NULL UNIQUE,
            is_staff            INTEGER NOT NULL DEFAULT 0,
            email_confirmed     INTEGER NOT NULL DEFAULT 0,
            confirmation_token  TEXT,
            token_issued_at     TEXT,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS announcements (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
            image_url   TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_announcements_user
            ON announcements(user_id, created_at);

        CREATE TABLE IF NOT EXISTS responses (
            id              TEXT PRIMARY KEY,
            announcement_id TEXT NOT NULL REFERENCES announcements(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            text            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'accepted', 'rejected')),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_responses_announcement
            ON responses(announcement_id, created_at);

        CREATE TABLE IF NOT EXISTS newsletter_subscribers (
            user_id         TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            active          INTEGER NOT NULL DEFAULT 1,
            subscribed_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    // Seed the fixed category set. Ids are stable across runs so that
    // redeployments don't re-link announcements.
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO categories (id, name) VALUES (?1, ?2)")?;
    for (i, name) in CATEGORY_NAMES.iter().enumerate() {
        let id = format!("00000000-0000-0000-0000-0000000000{:02}", i + 1);
        stmt.execute((id.as_str(), *name))?;
    }

    info!("Database migrations complete");
    Ok(())
}
