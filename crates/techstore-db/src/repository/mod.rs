//! # Repository Module
//!
//! Database repository implementations for TechStore.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler / service                                                 │
//! │       │                                                                 │
//! │       │  db.products().list_available()                                 │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── list_available(&self)                 ← pool connection            │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── insert(&self, product)                                             │
//! │  └── decrement_stock_if_available(conn, …) ← caller's transaction       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Staff accounts and password hashes
//! - [`SessionLogRepository`] - Login/logout audit rows
//! - [`ClientRepository`], [`CategoryRepository`], [`SupplierRepository`] - Catalog CRUD
//! - [`ProductRepository`] - Products and stock
//! - [`SaleRepository`] - Sales and sale lines
//! - [`CreditRepository`] - Credits and payments
//! - [`ReportRepository`] - Read-only aggregates

pub mod category;
pub mod client;
pub mod credit;
pub mod product;
pub mod report;
pub mod sale;
pub mod session_log;
pub mod supplier;
pub mod user;

pub use category::CategoryRepository;
pub use client::ClientRepository;
pub use credit::CreditRepository;
pub use product::ProductRepository;
pub use report::ReportRepository;
pub use sale::SaleRepository;
pub use session_log::SessionLogRepository;
pub use supplier::SupplierRepository;
pub use user::UserRepository;

/// Blank optional text is stored as NULL.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use techstore_core::{NewCategory, NewClient, NewProduct, NewUser, ROLE_OPERATOR_ID};

    use crate::pool::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Inserts an operator, a client, a category and one product with the
    /// given stock and price. Returns `(user_id, client_id, product_id)`.
    pub async fn seed_basics(db: &Database, stock: i64, price_cents: i64) -> (i64, i64, i64) {
        let user = db
            .users()
            .insert(
                &NewUser {
                    first_name: "Olga".into(),
                    last_name: "Operator".into(),
                    username: "olga".into(),
                    role_id: ROLE_OPERATOR_ID,
                },
                "not-a-real-hash",
            )
            .await
            .unwrap();

        let client = db
            .clients()
            .insert(&NewClient {
                first_name: "Ana".into(),
                last_name: "Perez".into(),
                document: Some("1712345678".into()),
                phone: None,
                address: None,
                email: None,
            })
            .await
            .unwrap();

        let category = db
            .categories()
            .insert(&NewCategory {
                name: "Laptops".into(),
                description: None,
            })
            .await
            .unwrap();

        let product = db
            .products()
            .insert(&NewProduct {
                name: "Laptop X".into(),
                description: None,
                purchase_price_cents: price_cents / 2,
                sale_price_cents: price_cents,
                stock,
                category_id: category.id,
                supplier_id: None,
            })
            .await
            .unwrap();

        (user.id, client.id, product.id)
    }
}
