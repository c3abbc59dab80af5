//! Response lifecycle operations.
//!
//! Every state change persists first and notifies second; a failed
//! notification comes back as a warning string next to the committed
//! result, never as an error. Only the announcement owner can drive
//! transitions, and any status is reachable from any other — owners may
//! change their mind.

use uuid::Uuid;

use guildpost_db::Database;
use guildpost_db::models::ResponseRow;
use guildpost_mail::{Notification, Notifier};
use guildpost_types::api::Claims;
use guildpost_types::models::ResponseStatus;

use crate::error::ApiError;

#[derive(Debug)]
pub struct TransitionOutcome {
    pub status: ResponseStatus,
    pub warning: Option<String>,
}

/// Create a new `pending` response and notify the announcement owner.
pub async fn submit(
    db: &Database,
    notifier: &Notifier,
    announcement_id: &str,
    actor: &Claims,
    text: &str,
) -> Result<(ResponseRow, Option<String>), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "response text must not be empty".into(),
        ));
    }

    let announcement = db
        .get_announcement(announcement_id)?
        .ok_or(ApiError::NotFound)?;
    let owner = db
        .get_user_by_id(&announcement.user_id)?
        .ok_or_else(|| anyhow::anyhow!("announcement {} has no owner row", announcement.id))?;

    let id = Uuid::new_v4().to_string();
    db.insert_response(&id, announcement_id, &actor.sub.to_string(), text)?;
    let row = db
        .get_response(&id)?
        .ok_or_else(|| anyhow::anyhow!("response {id} vanished after insert"))?;

    let warning = notifier
        .notify(
            &owner.email,
            Notification::NewResponse {
                responder: actor.username.clone(),
                title: announcement.title,
                text: row.text.clone(),
            },
        )
        .await;

    Ok((row, warning))
}

pub async fn accept(
    db: &Database,
    notifier: &Notifier,
    response_id: &str,
    actor: &Claims,
) -> Result<TransitionOutcome, ApiError> {
    transition(db, notifier, response_id, actor, ResponseStatus::Accepted).await
}

pub async fn reject(
    db: &Database,
    notifier: &Notifier,
    response_id: &str,
    actor: &Claims,
) -> Result<TransitionOutcome, ApiError> {
    transition(db, notifier, response_id, actor, ResponseStatus::Rejected).await
}

/// Explicit reset back to `pending`.
pub async fn reopen(
    db: &Database,
    notifier: &Notifier,
    response_id: &str,
    actor: &Claims,
) -> Result<TransitionOutcome, ApiError> {
    transition(db, notifier, response_id, actor, ResponseStatus::Pending).await
}

async fn transition(
    db: &Database,
    notifier: &Notifier,
    response_id: &str,
    actor: &Claims,
    status: ResponseStatus,
) -> Result<TransitionOutcome, ApiError> {
    let row = db.get_response(response_id)?.ok_or(ApiError::NotFound)?;
    authorize_owner(&row, actor)?;

    db.set_response_status(response_id, status.as_str())?;

    let notification = match status {
        ResponseStatus::Accepted => Notification::ResponseAccepted {
            title: row.announcement_title,
        },
        ResponseStatus::Rejected => Notification::ResponseRejected {
            title: row.announcement_title,
        },
        ResponseStatus::Pending => Notification::ResponseReopened {
            title: row.announcement_title,
        },
    };
    let warning = notifier.notify(&row.user_email, notification).await;

    Ok(TransitionOutcome { status, warning })
}

/// Delete a response. The responder's address and the surrounding context
/// are captured before the row goes away so the notification can still
/// reference them.
pub async fn delete(
    db: &Database,
    notifier: &Notifier,
    response_id: &str,
    actor: &Claims,
) -> Result<Option<String>, ApiError> {
    let row = db.get_response(response_id)?.ok_or(ApiError::NotFound)?;
    authorize_owner(&row, actor)?;

    db.delete_response(response_id)?;

    let warning = notifier
        .notify(
            &row.user_email,
            Notification::ResponseDeleted {
                title: row.announcement_title,
                text: row.text,
            },
        )
        .await;

    Ok(warning)
}

fn authorize_owner(row: &ResponseRow, actor: &Claims) -> Result<(), ApiError> {
    if row.announcement_owner_id != actor.sub.to_string() {
        return Err(ApiError::NotAuthorized);
    }
    Ok(())
}
