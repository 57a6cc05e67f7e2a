//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Listing what can be sold right now (`stock > 0`)
//! - Stock decrements during sale registration
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read stock, check in Rust, write absolute value              │
//! │     SELECT stock ...            -- both requests see 5                  │
//! │     UPDATE products SET stock = 2 WHERE id = ?                          │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta, checked by SQLite                       │
//! │     UPDATE products SET stock = stock - 3                               │
//! │     WHERE id = ? AND stock >= 3                                         │
//! │                                                                         │
//! │  Request A: sells 3 of 5 → 1 row affected, stock 2                      │
//! │  Request B: sells 3 of 2 → 0 rows affected → InsufficientStock          │
//! │  Stock can never go below zero.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use techstore_core::{NewProduct, Product};

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, purchase_price_cents, sale_price_cents,
    stock, category_id, supplier_id
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let available = repo.list_available().await?;
/// let product = repo.get_by_id(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Same as [`get_by_id`](Self::get_by_id), inside the caller's transaction.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Lists every product ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id");
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?;

        Ok(products)
    }

    /// Lists products with stock left, for the sale screen.
    pub async fn list_available(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE stock > 0 ORDER BY name, id");
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Available products listed");
        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - unknown category or supplier
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, stock = product.stock, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, description, purchase_price_cents, sale_price_cents,
                stock, category_id, supplier_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(product.name.trim())
        .bind(super::non_blank(&product.description))
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(product.supplier_id)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Updates an existing product, stock included.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored row after the update
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: i64, product: &NewProduct) -> DbResult<Product> {
        debug!(id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?1,
                description = ?2,
                purchase_price_cents = ?3,
                sale_price_cents = ?4,
                stock = ?5,
                category_id = ?6,
                supplier_id = ?7
            WHERE id = ?8
            "#,
        )
        .bind(product.name.trim())
        .bind(super::non_blank(&product.description))
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(product.supplier_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Sets the absolute stock level (inventory count, restock).
    pub async fn set_stock(&self, id: i64, stock: i64) -> DbResult<()> {
        debug!(id, stock, "Setting stock");

        let result = sqlx::query("UPDATE products SET stock = ?1 WHERE id = ?2")
            .bind(stock)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Takes `quantity` units off the shelf if, and only if, that many are
    /// in stock.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Not enough stock (or no such product); nothing changed
    pub async fn decrement_stock_if_available(
        conn: &mut SqliteConnection,
        id: i64,
        quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?1
            WHERE id = ?2 AND stock >= ?1
            "#,
        )
        .bind(quantity)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(id, quantity, applied, "Conditional stock decrement");
        Ok(applied)
    }

    /// Deletes a product that no sale line references.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::still_referenced(format!("product {id} appears on registered sales"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_basics, test_db};

    #[tokio::test]
    async fn test_decrement_respects_stock() {
        let db = test_db().await;
        let (_, _, product_id) = seed_basics(&db, 5, 1000).await;

        let mut tx = db.begin().await.unwrap();
        assert!(ProductRepository::decrement_stock_if_available(&mut tx, product_id, 3)
            .await
            .unwrap());
        // Only 2 left
        assert!(!ProductRepository::decrement_stock_if_available(&mut tx, product_id, 3)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn test_decrement_unknown_product() {
        let db = test_db().await;
        let mut tx = db.begin().await.unwrap();
        assert!(!ProductRepository::decrement_stock_if_available(&mut tx, 404, 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_available_skips_empty_stock() {
        let db = test_db().await;
        let (_, _, product_id) = seed_basics(&db, 0, 1000).await;

        assert_eq!(db.products().list().await.unwrap().len(), 1);
        assert!(db.products().list_available().await.unwrap().is_empty());

        db.products().set_stock(product_id, 4).await.unwrap();
        let available = db.products().list_available().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].stock, 4);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let (_, _, product_id) = seed_basics(&db, 3, 1000).await;
        let repo = db.products();

        let current = repo.get_by_id(product_id).await.unwrap().unwrap();
        let updated = repo
            .update(
                product_id,
                &NewProduct {
                    name: "Laptop X Pro".into(),
                    description: Some("16GB".into()),
                    purchase_price_cents: 60_000,
                    sale_price_cents: 90_000,
                    stock: 7,
                    category_id: current.category_id,
                    supplier_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Laptop X Pro");
        assert_eq!(updated.stock, 7);

        repo.delete(product_id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_unknown_category() {
        let db = test_db().await;
        let err = db
            .products()
            .insert(&NewProduct {
                name: "Orphan".into(),
                description: None,
                purchase_price_cents: 1,
                sale_price_cents: 2,
                stock: 1,
                category_id: 999,
                supplier_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
