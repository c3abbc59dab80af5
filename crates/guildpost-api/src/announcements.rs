use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use guildpost_types::api::{AnnouncementDetail, AnnouncementRequest, AnnouncementView, Claims};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::views::{announcement_view, response_view};

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_announcements()?;
    let views: Vec<AnnouncementView> = rows.into_iter().map(announcement_view).collect();
    Ok(Json(views))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let id = id.to_string();
    let row = state.db.get_announcement(&id)?.ok_or(ApiError::NotFound)?;
    let responses = state.db.responses_for_announcement(&id)?;

    Ok(Json(AnnouncementDetail {
        announcement: announcement_view(row),
        responses: responses.into_iter().map(response_view).collect(),
    }))
}

pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let names: Vec<String> = state
        .db
        .list_categories()?
        .into_iter()
        .map(|c| c.name)
        .collect();
    Ok(Json(names))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category_id = validate(&state, &req)?;

    let id = Uuid::new_v4();
    state.db.insert_announcement(
        &id.to_string(),
        &claims.sub.to_string(),
        &req.title,
        &req.content,
        category_id.as_deref(),
        req.image_url.as_deref(),
    )?;

    let row = state
        .db
        .get_announcement(&id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("announcement {id} vanished after insert"))?;

    Ok((StatusCode::CREATED, Json(announcement_view(row))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = id.to_string();
    let existing = state.db.get_announcement(&id)?.ok_or(ApiError::NotFound)?;
    if existing.user_id != claims.sub.to_string() {
        return Err(ApiError::NotAuthorized);
    }

    let category_id = validate(&state, &req)?;
    state.db.update_announcement(
        &id,
        &req.title,
        &req.content,
        category_id.as_deref(),
        req.image_url.as_deref(),
    )?;

    let row = state
        .db
        .get_announcement(&id)?
        .ok_or_else(|| anyhow::anyhow!("announcement {id} vanished after update"))?;
    Ok(Json(announcement_view(row)))
}

/// Deleting an announcement cascades to its responses at the storage layer.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = id.to_string();
    let existing = state.db.get_announcement(&id)?.ok_or(ApiError::NotFound)?;
    if existing.user_id != claims.sub.to_string() {
        return Err(ApiError::NotAuthorized);
    }

    state.db.delete_announcement(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check the request fields and resolve the category name to its id.
fn validate(state: &AppState, req: &AnnouncementRequest) -> Result<Option<String>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content must not be empty".into()));
    }

    match req.category.as_deref() {
        None => Ok(None),
        Some(name) => state
            .db
            .category_id_by_name(name)?
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown category '{name}'"))),
    }
}
