use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Domain and API errors. Every variant aborts its operation before any
/// persistence; notification failures are deliberately *not* represented
/// here — they travel as warnings on success replies instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authorized")]
    NotAuthorized,
    #[error("not found")]
    NotFound,
    #[error("confirmation code not found")]
    TokenNotFound,
    #[error("confirmation code expired, request a new one")]
    TokenExpired,
    #[error("message body must not be empty")]
    EmptyMessage,
    #[error("no active newsletter subscribers")]
    NoRecipients,
    #[error("{0}")]
    BadRequest(String),
    #[error("username or email already in use")]
    Conflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is not confirmed yet")]
    NotConfirmed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAuthorized => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::TokenNotFound => StatusCode::NOT_FOUND,
            ApiError::TokenExpired => StatusCode::GONE,
            ApiError::EmptyMessage | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoRecipients => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotConfirmed => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
