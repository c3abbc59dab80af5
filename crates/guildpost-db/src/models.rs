/// Database row types — these map directly to SQLite rows.
/// Distinct from guildpost-types API models to keep the DB layer independent.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub is_staff: bool,
    pub email_confirmed: bool,
    pub confirmation_token: Option<String>,
    pub token_issued_at: Option<String>,
    pub created_at: String,
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
}

pub struct AnnouncementRow {
    pub id: String,
    pub user_id: String,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
}

/// Response joined with its announcement (for ownership checks) and with
/// both users (responder address for notifications).
#[derive(Debug)]
pub struct ResponseRow {
    pub id: String,
    pub announcement_id: String,
    pub announcement_title: String,
    pub announcement_owner_id: String,
    pub user_id: String,
    pub username: String,
    pub user_email: String,
    pub text: String,
    pub status: String,
    pub created_at: String,
}
