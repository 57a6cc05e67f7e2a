//! # Session Log Repository
//!
//! One row per login. `logout_at` stays NULL while the session is open and
//! is written at most once.
//!
//! ```text
//! login  ──► INSERT (login_at = now, logout_at = NULL)
//! logout ──► UPDATE SET logout_at = now WHERE id = ? AND logout_at IS NULL
//! logout ──► (no row matches, first logout time kept)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use techstore_core::SessionLog;

/// Repository for session log rows.
#[derive(Debug, Clone)]
pub struct SessionLogRepository {
    pool: SqlitePool,
}

impl SessionLogRepository {
    /// Creates a new SessionLogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionLogRepository { pool }
    }

    /// Opens a log row for a successful login. Returns the new row id.
    pub async fn record_login(&self, user_id: i64, origin: &str, note: &str) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO session_logs (user_id, login_at, logout_at, origin, note)
            VALUES (?1, ?2, NULL, ?3, ?4)
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .bind(origin)
        .bind(note)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(session_log_id = id, user_id, "Session log opened");
        Ok(id)
    }

    /// Closes a log row.
    ///
    /// Returns `true` when this call wrote the logout time, `false` when
    /// the row was already closed or doesn't exist.
    pub async fn record_logout(&self, id: i64) -> DbResult<bool> {
        self.record_logout_at(id, Utc::now()).await
    }

    /// Closes a log row at a given time, e.g. when a session timed out
    /// earlier than anyone noticed.
    pub async fn record_logout_at(&self, id: i64, at: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE session_logs SET logout_at = ?1 WHERE id = ?2 AND logout_at IS NULL",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<SessionLog>> {
        let log = sqlx::query_as::<_, SessionLog>(
            r#"
            SELECT id, user_id, login_at, logout_at, origin, note
            FROM session_logs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    /// Logs of one user, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> DbResult<Vec<SessionLog>> {
        let logs = sqlx::query_as::<_, SessionLog>(
            r#"
            SELECT id, user_id, login_at, logout_at, origin, note
            FROM session_logs
            WHERE user_id = ?1
            ORDER BY login_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
