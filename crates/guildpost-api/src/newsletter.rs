//! Opt-in newsletter: subscription upkeep and the one-shot staff
//! broadcast to every active subscriber. Nothing is persisted per
//! broadcast, so a failed send has nothing to roll back.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use guildpost_db::Database;
use guildpost_mail::Notifier;
use guildpost_types::api::{BroadcastReply, BroadcastRequest, Claims};

use crate::auth::AppState;
use crate::error::ApiError;

/// One send addressed to all active subscribers at once.
pub async fn broadcast(
    db: &Database,
    notifier: &Notifier,
    actor: &Claims,
    subject: &str,
    body: &str,
) -> Result<(usize, Option<String>), ApiError> {
    if !actor.staff {
        return Err(ApiError::NotAuthorized);
    }
    if body.trim().is_empty() {
        return Err(ApiError::EmptyMessage);
    }

    let recipients = db.active_subscriber_emails()?;
    if recipients.is_empty() {
        return Err(ApiError::NoRecipients);
    }

    let warning = notifier.broadcast(&recipients, subject, body).await;
    Ok((recipients.len(), warning))
}

pub async fn broadcast_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BroadcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (recipients, warning) = broadcast(
        &state.db,
        &state.notifier,
        &claims,
        &req.subject,
        &req.body,
    )
    .await?;

    Ok(Json(BroadcastReply {
        recipients,
        warning,
    }))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.set_subscription(&claims.sub.to_string(), true)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.set_subscription(&claims.sub.to_string(), false)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mail::{failing, recording};
    use uuid::Uuid;

    fn staff() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            username: "admin".into(),
            staff: true,
            exp: 0,
        }
    }

    fn member() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            username: "bob".into(),
            staff: false,
            exp: 0,
        }
    }

    fn subscribed_user(db: &Database, username: &str, active: bool) {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@guild.test"), "hash", false)
            .unwrap();
        db.set_subscription(&id, active).unwrap();
    }

    #[tokio::test]
    async fn broadcast_requires_staff() {
        let db = Database::open_in_memory().unwrap();
        let (mailer, notifier) = recording();
        subscribed_user(&db, "alice", true);

        let err = broadcast(&db, &notifier, &member(), "News", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotAuthorized));
        assert_eq!(mailer.count(), 0);
    }

    #[tokio::test]
    async fn broadcast_rejects_blank_body() {
        let db = Database::open_in_memory().unwrap();
        let (mailer, notifier) = recording();
        subscribed_user(&db, "alice", true);

        let err = broadcast(&db, &notifier, &staff(), "News", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::EmptyMessage));
        assert_eq!(mailer.count(), 0);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_reports_no_recipients() {
        let db = Database::open_in_memory().unwrap();
        let (_, notifier) = recording();
        subscribed_user(&db, "alice", false);

        let err = broadcast(&db, &notifier, &staff(), "News", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NoRecipients));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_active_subscribers() {
        let db = Database::open_in_memory().unwrap();
        let (mailer, notifier) = recording();
        subscribed_user(&db, "alice", true);
        subscribed_user(&db, "bob", true);
        subscribed_user(&db, "carol", false);

        let (count, warning) = broadcast(&db, &notifier, &staff(), "News", "hello")
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(warning.is_none());
        let mail = mailer.last();
        assert_eq!(mail.to.len(), 2);
        assert!(!mail.to.contains(&"carol@guild.test".to_string()));
    }

    #[tokio::test]
    async fn transport_failure_is_a_warning_not_an_error() {
        let db = Database::open_in_memory().unwrap();
        let notifier = failing();
        subscribed_user(&db, "alice", true);

        let (count, warning) = broadcast(&db, &notifier, &staff(), "News", "hello")
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(warning.is_some());
    }
}
