//! Authentication service.
//!
//! Checks credentials, keeps the session log and manages staff accounts.
//!
//! ## Login
//! ```text
//! username ──► find_by_username (case-insensitive)
//!                 │ none / inactive / bad password ──► Ok(None)
//!                 ▼
//!             AccessLevel::from_role_id ── unknown ──► Err (no log row)
//!                 │
//!                 ▼
//!             session_logs INSERT (logout_at = NULL) ──► Ok(Some(LoginOutcome))
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use techstore_core::validation::{validate_new_user, validate_password};
use techstore_core::{AccessLevel, NewUser, User, UserStatus, ValidationError, DEFAULT_LOGIN_NOTE, ROLE_ADMIN_ID};
use techstore_db::password::{hash_password, verify_password};
use techstore_db::Database;

use crate::error::{ApiError, ApiResult, ErrorCode};

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session_log_id: i64,
    pub level: AccessLevel,
}

/// Authentication and account management.
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        AuthService { db }
    }

    /// Verifies credentials and opens a session log row.
    ///
    /// Returns `Ok(None)` for an unknown user, an inactive account or a
    /// wrong password. The caller can't tell these apart.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        origin: &str,
        note: Option<&str>,
    ) -> ApiResult<Option<LoginOutcome>> {
        let Some(user) = self.db.users().find_by_username(username).await? else {
            warn!(username = %username.trim(), "Login rejected: unknown user");
            return Ok(None);
        };

        if !user.is_active() {
            warn!(user_id = user.id, "Login rejected: account inactive");
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Login rejected: wrong password");
            return Ok(None);
        }

        let level = AccessLevel::from_role_id(user.role_id)?;

        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_LOGIN_NOTE);
        let session_log_id = self.db.session_logs().record_login(user.id, origin, note).await?;

        info!(user_id = user.id, session_log_id, %level, "User logged in");

        Ok(Some(LoginOutcome {
            user,
            session_log_id,
            level,
        }))
    }

    /// Closes a session log row. Closing it twice keeps the first time.
    pub async fn logout(&self, session_log_id: i64) -> ApiResult<bool> {
        let closed = self.db.session_logs().record_logout(session_log_id).await?;
        info!(session_log_id, closed, "User logged out");
        Ok(closed)
    }

    /// Closes the log row of a session that timed out, stamped with the
    /// time it expired rather than the time it was noticed.
    pub async fn record_expiry(&self, session_log_id: i64, expired_at: DateTime<Utc>) -> ApiResult<bool> {
        let closed = self
            .db
            .session_logs()
            .record_logout_at(session_log_id, expired_at)
            .await?;
        info!(session_log_id, closed, %expired_at, "Session expired");
        Ok(closed)
    }

    /// Creates an active account with a freshly hashed password.
    pub async fn create_user(&self, user: &NewUser, password: &str) -> ApiResult<User> {
        validate_new_user(user)?;
        validate_password(password)?;
        AccessLevel::from_role_id(user.role_id)?;

        if self.db.users().find_by_username(&user.username).await?.is_some() {
            return Err(ValidationError::Duplicate {
                field: "username".to_string(),
                value: user.username.trim().to_string(),
            }
            .into());
        }

        let hash = hash_password(password)?;
        let created = self.db.users().insert(user, &hash).await?;

        info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    /// Replaces a user's password.
    pub async fn change_password(&self, user_id: i64, new_password: &str) -> ApiResult<()> {
        validate_password(new_password)?;

        if self.db.users().get_by_id(user_id).await?.is_none() {
            return Err(ApiError::not_found("User", user_id));
        }

        let hash = hash_password(new_password)?;
        self.db.users().update_password_hash(user_id, &hash).await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    /// Edits names, username and role. Password and status are untouched.
    pub async fn update_user(&self, user_id: i64, user: &NewUser) -> ApiResult<User> {
        validate_new_user(user)?;
        AccessLevel::from_role_id(user.role_id)?;

        if let Some(existing) = self.db.users().find_by_username(&user.username).await? {
            if existing.id != user_id {
                return Err(ValidationError::Duplicate {
                    field: "username".to_string(),
                    value: user.username.trim().to_string(),
                }
                .into());
            }
        }

        let updated = self.db.users().update_profile(user_id, user).await?;
        info!(user_id, "User updated");
        Ok(updated)
    }

    /// Deletes an account with no history. `acting_user_id` may not delete
    /// itself.
    pub async fn delete_user(&self, acting_user_id: i64, user_id: i64) -> ApiResult<()> {
        if acting_user_id == user_id {
            return Err(ApiError::new(
                ErrorCode::BusinessLogic,
                "You cannot delete your own account",
            ));
        }

        self.db.users().delete(user_id).await?;
        info!(user_id, "User deleted");
        Ok(())
    }

    /// Activates or deactivates an account.
    pub async fn set_status(&self, user_id: i64, status: UserStatus) -> ApiResult<User> {
        self.db.users().update_status(user_id, status).await?;
        info!(user_id, status = ?status, "User status changed");

        self.db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user_id))
    }

    /// Creates the first administrator when no account exists yet.
    ///
    /// Returns the new user, or `None` if users were already present.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> ApiResult<Option<User>> {
        if self.db.users().count().await? > 0 {
            return Ok(None);
        }

        let admin = self
            .create_user(
                &NewUser {
                    first_name: "Administrator".to_string(),
                    last_name: String::new(),
                    username: username.to_string(),
                    role_id: ROLE_ADMIN_ID,
                },
                password,
            )
            .await?;

        info!(username = %admin.username, "Bootstrap administrator created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::test_support::{seed_staff, test_db, user_id, TEST_PASSWORD};

    #[tokio::test]
    async fn test_login_success_opens_one_log() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());

        let outcome = auth
            .login("OLGA", TEST_PASSWORD, "127.0.0.1", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.user.username, "olga");
        assert_eq!(outcome.level, AccessLevel::Level2);

        let logs = db.session_logs().list_for_user(outcome.user.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, outcome.session_log_id);
        assert!(logs[0].logout_at.is_none());
        assert_eq!(logs[0].note, DEFAULT_LOGIN_NOTE);
        assert_eq!(logs[0].origin, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_login_failures_return_none_without_log() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());
        let olga = user_id(&db, "olga").await;

        assert!(auth.login("nobody", TEST_PASSWORD, "test", None).await.unwrap().is_none());
        assert!(auth.login("olga", "wrong-password", "test", None).await.unwrap().is_none());

        auth.set_status(olga, UserStatus::Inactive).await.unwrap();
        assert!(auth.login("olga", TEST_PASSWORD, "test", None).await.unwrap().is_none());

        assert!(db.session_logs().list_for_user(olga).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_is_observable_and_idempotent() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());

        let outcome = auth
            .login("admin", TEST_PASSWORD, "test", Some("morning shift"))
            .await
            .unwrap()
            .unwrap();

        assert!(auth.logout(outcome.session_log_id).await.unwrap());
        let first = db
            .session_logs()
            .get_by_id(outcome.session_log_id)
            .await
            .unwrap()
            .unwrap();
        assert!(first.logout_at.is_some());
        assert_eq!(first.note, "morning shift");

        assert!(!auth.logout(outcome.session_log_id).await.unwrap());
        let second = db
            .session_logs()
            .get_by_id(outcome.session_log_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.logout_at, second.logout_at);
    }

    #[tokio::test]
    async fn test_expiry_closes_log_at_expiry_time() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());

        let outcome = auth.login("vera", TEST_PASSWORD, "test", None).await.unwrap().unwrap();
        let log = db
            .session_logs()
            .get_by_id(outcome.session_log_id)
            .await
            .unwrap()
            .unwrap();
        let expired_at = log.login_at + chrono::Duration::minutes(30);

        assert!(auth.record_expiry(outcome.session_log_id, expired_at).await.unwrap());
        assert!(!auth.logout(outcome.session_log_id).await.unwrap());

        let closed = db
            .session_logs()
            .get_by_id(outcome.session_log_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.logout_at, Some(expired_at));
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates_any_case() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db);

        let err = auth
            .create_user(
                &NewUser {
                    first_name: "Other".into(),
                    last_name: "Olga".into(),
                    username: "Olga".into(),
                    role_id: 2,
                },
                TEST_PASSWORD,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_create_user_rejects_unknown_role_and_short_password() {
        let db = test_db().await;
        let auth = AuthService::new(db);
        let user = NewUser {
            first_name: "New".into(),
            last_name: "Person".into(),
            username: "newbie".into(),
            role_id: 9,
        };

        let err = auth.create_user(&user, TEST_PASSWORD).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let user = NewUser { role_id: 3, ..user };
        let err = auth.create_user(&user, "short").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());
        let vera = user_id(&db, "vera").await;

        auth.change_password(vera, "a-brand-new-pass").await.unwrap();
        assert!(auth.login("vera", TEST_PASSWORD, "t", None).await.unwrap().is_none());
        assert!(auth.login("vera", "a-brand-new-pass", "t", None).await.unwrap().is_some());

        let err = auth.change_password(4040, "a-brand-new-pass").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_ensure_admin_only_on_empty_table() {
        let db = test_db().await;
        let auth = AuthService::new(db.clone());

        let admin = auth.ensure_admin("root", "bootstrap-pass").await.unwrap().unwrap();
        assert_eq!(admin.role_id, ROLE_ADMIN_ID);
        assert!(auth.ensure_admin("root2", "bootstrap-pass").await.unwrap().is_none());
        assert_eq!(db.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let db = test_db().await;
        seed_staff(&db).await;
        let auth = AuthService::new(db.clone());
        let admin = user_id(&db, "admin").await;
        let vera = user_id(&db, "vera").await;

        let promoted = NewUser {
            first_name: "Vera".into(),
            last_name: "Lopez".into(),
            username: "vera".into(),
            role_id: 2,
        };
        let updated = auth.update_user(vera, &promoted).await.unwrap();
        assert_eq!(updated.role_id, 2);
        assert_eq!(updated.full_name(), "Vera Lopez");

        let taken = NewUser { username: "OLGA".into(), ..promoted };
        assert_eq!(auth.update_user(vera, &taken).await.unwrap_err().code, ErrorCode::Conflict);

        assert_eq!(
            auth.delete_user(admin, admin).await.unwrap_err().code,
            ErrorCode::BusinessLogic
        );
        auth.delete_user(admin, vera).await.unwrap();
        assert!(db.users().get_by_id(vera).await.unwrap().is_none());
    }
}
