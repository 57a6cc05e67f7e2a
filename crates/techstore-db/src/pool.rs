//! # Connection Pool
//!
//! Opens the store's SQLite file, applies migrations and hands out
//! repositories.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new("./techstore.db")          DbConfig::in_memory()         │
//! │        │  WAL, busy timeout, FKs ON             │  one pinned connection│
//! │        └──────────────┬─────────────────────────┘                       │
//! │                       ▼                                                 │
//! │            Database::new(config) ── migrations::run_migrations          │
//! │                       │                                                 │
//! │        ┌──────────────┼───────────────────────┐                         │
//! │        ▼              ▼                       ▼                         │
//! │   db.products()   db.begin() → DbTransaction   db.reports()             │
//! │   (pool reads)    (sale, payment, deletes)     (report queries)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! SQLite allows one writer at a time. Two sales committing together make
//! the second connection wait up to `busy_timeout` for the lock instead of
//! failing immediately with `SQLITE_BUSY`. WAL keeps report reads from
//! blocking on those writers.

use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CategoryRepository, ClientRepository, CreditRepository, ProductRepository, ReportRepository,
    SaleRepository, SessionLogRepository, SupplierRepository, UserRepository,
};

/// An open SQLite transaction. Dropping it without `commit()` rolls back.
pub type DbTransaction = Transaction<'static, Sqlite>;

/// Where the database lives and how many connections may use it.
///
/// ```rust,ignore
/// let config = DbConfig::new("./techstore.db").max_connections(8);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created when missing. Ignored for in-memory databases.
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for another writer's lock.
    pub busy_timeout: Duration,
    /// How long a request waits for a free pool connection.
    pub acquire_timeout: Duration,
    in_memory: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            in_memory: false,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// A private database that lives as long as the pool (tests).
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 1,
            busy_timeout: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(5),
            in_memory: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout);

        if self.in_memory {
            options.in_memory(true)
        } else {
            options
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
    }
}

/// Handle to the store database. Clones share one pool.
///
/// Repositories are cheap views over the pool, created per call:
///
/// ```rust,ignore
/// let product = db.products().get_by_id(id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.path.display(),
            in_memory = config.in_memory,
            max_connections = config.max_connections,
            "Opening database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);

        if config.in_memory {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!("Pool connected");

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    /// The underlying pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begins a transaction.
    ///
    /// Every multi-row workflow (sale registration, payment, cascading
    /// deletes) runs inside one of these.
    pub async fn begin(&self) -> DbResult<DbTransaction> {
        self.pool.begin().await.map_err(DbError::transaction)
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn session_logs(&self) -> SessionLogRepository {
        SessionLogRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn credits(&self) -> CreditRepository {
        CreditRepository::new(self.pool.clone())
    }

    /// Read-only report queries.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
