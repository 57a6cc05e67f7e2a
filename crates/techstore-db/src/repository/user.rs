//! # User Repository
//!
//! Staff accounts. Usernames are unique without regard to case; the
//! `users.username` column and its index are both `COLLATE NOCASE`, so
//! `find_by_username("ADMIN")` finds `admin`.
//!
//! The password hash is written here but never produced here: callers pass
//! a PHC string from [`crate::password::hash_password`].

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use techstore_core::{NewUser, User, UserStatus};

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, username, password_hash,
    status, role_id, created_at, updated_at
"#;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Looks a user up by username, ignoring case.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1 COLLATE NOCASE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Lists all users ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY username");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;

        Ok(users)
    }

    /// Number of user rows. Used by the admin bootstrap at startup.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a new active user with an already-hashed password.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - username taken (any case)
    /// * `DbError::ForeignKeyViolation` - role id has no `roles` row
    pub async fn insert(&self, user: &NewUser, password_hash: &str) -> DbResult<User> {
        let now = Utc::now();
        let username = user.username.trim();

        debug!(username = %username, role_id = user.role_id, "Inserting user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                first_name, last_name, username, password_hash,
                status, role_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(username)
        .bind(password_hash)
        .bind(UserStatus::Active)
        .bind(user.role_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
            other => other,
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Updates names, username and role. Leaves the hash and status alone.
    pub async fn update_profile(&self, id: i64, user: &NewUser) -> DbResult<User> {
        let username = user.username.trim();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?1, last_name = ?2, username = ?3,
                role_id = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(username)
        .bind(user.role_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", username),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Replaces the stored password hash. Nothing else on the row changes
    /// apart from `updated_at`.
    pub async fn update_password_hash(&self, id: i64, password_hash: &str) -> DbResult<()> {
        debug!(user_id = id, "Updating password hash");

        let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Activates or deactivates an account.
    pub async fn update_status(&self, id: i64, status: UserStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Deletes a user. Refused while sales or session logs reference it;
    /// deactivate the account instead.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::still_referenced(format!("user {id} has sales or session history"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use techstore_core::{ROLE_ADMIN_ID, ROLE_OCCASIONAL_ID};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            first_name: "Test".into(),
            last_name: "User".into(),
            username: username.into(),
            role_id: ROLE_ADMIN_ID,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_case_insensitive() {
        let db = test_db().await;
        let repo = db.users();

        let created = repo.insert(&new_user("Admin"), "hash").await.unwrap();
        assert_eq!(created.status, UserStatus::Active);
        assert!(created.updated_at.is_none());

        let found = repo.find_by_username("ADMIN").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash");

        assert!(repo.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_any_case() {
        let db = test_db().await;
        let repo = db.users();

        repo.insert(&new_user("maria"), "h1").await.unwrap();
        let err = repo.insert(&new_user("MARIA"), "h2").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "username"));
    }

    #[tokio::test]
    async fn test_update_password_hash_only_touches_hash() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.insert(&new_user("pedro"), "old").await.unwrap();
        repo.update_password_hash(user.id, "new").await.unwrap();

        let reloaded = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new");
        assert_eq!(reloaded.username, "pedro");
        assert_eq!(reloaded.role_id, ROLE_ADMIN_ID);
        assert!(reloaded.updated_at.is_some());

        let err = repo.update_password_hash(999, "x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_status_and_profile() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.insert(&new_user("luis"), "h").await.unwrap();
        repo.update_status(user.id, UserStatus::Inactive).await.unwrap();

        let mut changes = new_user("luis.m");
        changes.role_id = ROLE_OCCASIONAL_ID;
        let updated = repo.update_profile(user.id, &changes).await.unwrap();

        assert_eq!(updated.status, UserStatus::Inactive);
        assert_eq!(updated.username, "luis.m");
        assert_eq!(updated.role_id, ROLE_OCCASIONAL_ID);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let repo = db.users();

        let user = repo.insert(&new_user("temp"), "h").await.unwrap();
        repo.delete(user.id).await.unwrap();
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
        assert!(repo.delete(user.id).await.unwrap_err().is_not_found());
    }
}
