use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use guildpost_types::api::{ActionReply, Claims, ResponseView, SubmitReply, SubmitResponseRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::lifecycle;
use crate::views::response_view;

pub async fn submit(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (row, warning) = lifecycle::submit(
        &state.db,
        &state.notifier,
        &announcement_id.to_string(),
        &claims,
        &req.text,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReply {
            response: response_view(row),
            warning,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct MyResponsesQuery {
    /// Narrow to one of the caller's announcements.
    pub announcement: Option<Uuid>,
    /// Narrow by category name of the announcement.
    pub category: Option<String>,
}

/// Responses to the caller's own announcements, for moderation.
pub async fn my_responses(
    State(state): State<AppState>,
    Query(query): Query<MyResponsesQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let announcement_id = query.announcement.map(|id| id.to_string());
    let rows = state.db.responses_for_owner(
        &claims.sub.to_string(),
        announcement_id.as_deref(),
        query.category.as_deref(),
    )?;

    let views: Vec<ResponseView> = rows.into_iter().map(response_view).collect();
    Ok(Json(views))
}

pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        lifecycle::accept(&state.db, &state.notifier, &id.to_string(), &claims).await?;
    Ok(Json(ActionReply {
        status: Some(outcome.status),
        warning: outcome.warning,
    }))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        lifecycle::reject(&state.db, &state.notifier, &id.to_string(), &claims).await?;
    Ok(Json(ActionReply {
        status: Some(outcome.status),
        warning: outcome.warning,
    }))
}

pub async fn reopen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome =
        lifecycle::reopen(&state.db, &state.notifier, &id.to_string(), &claims).await?;
    Ok(Json(ActionReply {
        status: Some(outcome.status),
        warning: outcome.warning,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let warning = lifecycle::delete(&state.db, &state.notifier, &id.to_string(), &claims).await?;
    Ok(Json(ActionReply {
        status: None,
        warning,
    }))
}
