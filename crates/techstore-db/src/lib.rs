//! # techstore-db: Database Layer for TechStore
//!
//! SQLite storage for every TechStore entity, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TechStore Data Flow                              │
//! │                                                                         │
//! │  axum handler ──► service (AuthService, SaleService, ReportService)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   techstore-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ user, client,  │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ product, sale, │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │    │ credit, report │    │              │  │   │
//! │  │   │ begin() → tx  │    │ session_log …  │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (./techstore.db, WAL mode)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//! Repository methods that take `&self` run on the pool. Methods whose name
//! ends in `_in` take `&mut SqliteConnection` so a service can chain several
//! of them inside one transaction:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! let sale_id = SaleRepository::insert_sale_in(&mut tx, &new_sale).await?;
//! SaleRepository::insert_line_in(&mut tx, sale_id, &line).await?;
//! tx.commit().await.map_err(DbError::transaction)?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, DbTransaction};

pub use repository::category::CategoryRepository;
pub use repository::client::ClientRepository;
pub use repository::credit::CreditRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::session_log::SessionLogRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
