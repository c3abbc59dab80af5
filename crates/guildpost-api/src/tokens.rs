use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;

use guildpost_db::Database;
use guildpost_db::models::UserRow;

use crate::error::ApiError;

/// How long a confirmation token stays consumable after issuance.
pub const TOKEN_VALIDITY_HOURS: i64 = 24;

const TOKEN_LEN: usize = 32;

/// Generate and persist a fresh confirmation token for the user,
/// overwriting (and thereby invalidating) any previous one.
pub fn issue_token(db: &Database, user_id: &str, now: DateTime<Utc>) -> Result<String, ApiError> {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();

    db.set_confirmation_token(user_id, &token, &now.to_rfc3339())?;
    Ok(token)
}

/// Look up the user owning `code` and consume the token.
///
/// Fails with `TokenNotFound` when no user carries the code, and with
/// `TokenExpired` past the validity window — the stale token is left in
/// place so a follow-up `issue_token` can replace it. On success the
/// account is activated and the token cleared in one UPDATE.
pub fn validate_and_consume(
    db: &Database,
    code: &str,
    now: DateTime<Utc>,
) -> Result<UserRow, ApiError> {
    let user = db.get_user_by_token(code)?.ok_or(ApiError::TokenNotFound)?;

    let issued_at = user
        .token_issued_at
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("token without issuance timestamp on user {}", user.id))?;
    let issued_at = issued_at
        .parse::<DateTime<Utc>>()
        .map_err(|e| anyhow::anyhow!("corrupt token_issued_at on user {}: {e}", user.id))?;

    if now > issued_at + Duration::hours(TOKEN_VALIDITY_HOURS) {
        return Err(ApiError::TokenExpired);
    }

    db.confirm_user(&user.id)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn new_user(db: &Database) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, "carol", "carol@guild.test", "hash", false)
            .unwrap();
        id
    }

    #[test]
    fn token_is_valid_just_inside_the_window() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db);

        let issued = Utc::now();
        let token = issue_token(&db, &user, issued).unwrap();
        assert_eq!(token.len(), TOKEN_LEN);

        let almost_expired = issued + Duration::hours(23) + Duration::minutes(59);
        let consumed = validate_and_consume(&db, &token, almost_expired).unwrap();
        assert_eq!(consumed.id, user);

        let row = db.get_user_by_id(&user).unwrap().unwrap();
        assert!(row.email_confirmed);
    }

    #[test]
    fn token_expires_after_the_window() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db);

        let issued = Utc::now();
        let token = issue_token(&db, &user, issued).unwrap();

        let too_late = issued + Duration::hours(24) + Duration::minutes(1);
        let err = validate_and_consume(&db, &token, too_late).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));

        // The stale token stays put for an explicit re-issue.
        let row = db.get_user_by_id(&user).unwrap().unwrap();
        assert_eq!(row.confirmation_token.as_deref(), Some(token.as_str()));
        assert!(!row.email_confirmed);
    }

    #[test]
    fn consumed_token_cannot_be_used_twice() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db);

        let issued = Utc::now();
        let token = issue_token(&db, &user, issued).unwrap();

        validate_and_consume(&db, &token, issued).unwrap();
        let err = validate_and_consume(&db, &token, issued).unwrap_err();
        assert!(matches!(err, ApiError::TokenNotFound));
    }

    #[test]
    fn reissue_invalidates_the_previous_token() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db);

        let issued = Utc::now();
        let first = issue_token(&db, &user, issued).unwrap();
        let second = issue_token(&db, &user, issued).unwrap();
        assert_ne!(first, second);

        let err = validate_and_consume(&db, &first, issued).unwrap_err();
        assert!(matches!(err, ApiError::TokenNotFound));
        validate_and_consume(&db, &second, issued).unwrap();
    }

    #[test]
    fn unknown_code_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        new_user(&db);

        let err = validate_and_consume(&db, "nosuchtoken", Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::TokenNotFound));
    }
}
