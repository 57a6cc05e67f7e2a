//! Errors raised by the storage layer.
//!
//! SQLite reports constraint failures as plain text; [`DbError`] sorts them
//! into variants the server can map to status codes without re-reading the
//! message (`sqlx::Error` → `DbError` → `ApiError`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// Update, delete or lookup by an id that has no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate username, second credit for
    /// the same sale).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// An insert or update pointed at a row that does not exist, e.g. a
    /// product in an unknown category.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A delete refused because other rows still depend on the target.
    /// The message names the dependency ("category 3 still has products").
    #[error("{0}")]
    StillReferenced(String),

    /// CHECK constraint violation (negative stock, balance above total).
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    /// The pool could not open the SQLite file.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement error reported by SQLite.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every connection stayed checked out past `acquire_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn still_referenced(message: impl Into<String>) -> Self {
        DbError::StillReferenced(message.into())
    }

    /// Wraps a failure to begin or commit a transaction.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Constraint failures are recognised by SQLite's message prefix; anything
/// unrecognised from the database becomes `QueryFailed`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                //   "UNIQUE constraint failed: users.username"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: stock >= 0"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database pool closed".into()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
