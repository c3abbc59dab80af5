use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use guildpost_db::Database;
use guildpost_mail::{Notification, Notifier};
use guildpost_types::api::{
    Claims, ConfirmRequest, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    ResendCodeRequest,
};

use crate::error::ApiError;
use crate::tokens;
use crate::views::parse_id;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub notifier: Notifier,
}

/// Create an inactive account and mail out the confirmation code. The
/// account exists even when the mail fails — the code can be re-requested.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }

    if state.db.get_user_by_username(&req.username)?.is_some() || state.db.email_taken(&req.email)?
    {
        return Err(ApiError::Conflict);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();
    state
        .db
        .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash, false)?;

    let code = tokens::issue_token(&state.db, &user_id.to_string(), Utc::now())?;
    let warning = state
        .notifier
        .notify(&req.email, Notification::ConfirmRegistration { code })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, warning }),
    ))
}

/// Consume the confirmation code and log the fresh account in.
pub async fn confirm(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = tokens::validate_and_consume(&state.db, &req.code, Utc::now())?;

    let user_id = parse_id(&user.id, "confirmed user");
    let token = create_token(&state.jwt_secret, user_id, &user.username, user.is_staff)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// Regenerate the confirmation code for a not-yet-confirmed account.
pub async fn resend_code(
    State(state): State<AppState>,
    Json(req): Json<ResendCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::NotFound)?;
    if user.email_confirmed {
        return Err(ApiError::BadRequest("account is already confirmed".into()));
    }

    let code = tokens::issue_token(&state.db, &user.id, Utc::now())?;
    let warning = state
        .notifier
        .notify(&user.email, Notification::ConfirmRegistration { code })
        .await;

    Ok(Json(RegisterResponse {
        user_id: parse_id(&user.id, "resend target"),
        warning,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for {}: {e}", user.username))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    if !user.email_confirmed {
        return Err(ApiError::NotConfirmed);
    }

    let user_id = parse_id(&user.id, "login user");
    let token = create_token(&state.jwt_secret, user_id, &user.username, user.is_staff)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    staff: bool,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        staff,
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
