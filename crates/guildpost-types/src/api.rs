use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ResponseStatus;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the handlers that
/// need the acting user. Canonical definition lives here in
/// guildpost-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub staff: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    /// Set when the confirmation mail could not be delivered; the account
    /// still exists and the code can be re-requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResendCodeRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Announcements --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnouncementRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_username: String,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementDetail {
    #[serde(flatten)]
    pub announcement: AnnouncementView,
    pub responses: Vec<ResponseView>,
}

// -- Responses --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitResponseRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub id: Uuid,
    pub announcement_id: Uuid,
    pub announcement_title: String,
    pub user_id: Uuid,
    pub username: String,
    pub text: String,
    pub status: ResponseStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SubmitReply {
    pub response: ResponseView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Reply to a state-changing call. `warning` carries a best-effort
/// notification failure; the underlying change already committed.
#[derive(Debug, Serialize)]
pub struct ActionReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// -- Newsletter --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct BroadcastReply {
    pub recipients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
