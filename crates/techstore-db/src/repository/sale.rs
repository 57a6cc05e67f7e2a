//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. REGISTER (one transaction, driven by the sale service)              │
//! │     └── insert_sale_in()   → sales row (total, is_credit)               │
//! │     └── insert_line_in()   → sale_lines row per product                 │
//! │     └── ProductRepository::decrement_stock_if_available()               │
//! │     └── CreditRepository::insert_in()  (credit sales only)              │
//! │                                                                         │
//! │  2. READ                                                                │
//! │     └── get_by_id() / get_lines() / get_detail() / list()               │
//! │                                                                         │
//! │  3. (OPTIONAL) DELETE                                                   │
//! │     └── delete() → lines, then header; refused if a credit exists       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sale lines snapshot the unit price at the time of sale, so later price
//! changes don't rewrite history.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::credit::CreditRepository;
use techstore_core::{Client, NewSale, NewSaleLine, Sale, SaleDetail, SaleLine, SaleLineDetail};

const SALE_COLUMNS: &str = "id, sold_at, user_id, client_id, total_cents, is_credit";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Lists sale headers, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY sold_at DESC, id DESC LIMIT ?1");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Inserts a sale header stamped with the current time.
    /// Returns the new sale id.
    pub async fn insert_sale_in(conn: &mut SqliteConnection, sale: &NewSale) -> DbResult<i64> {
        debug!(
            client_id = sale.client_id,
            total_cents = sale.total_cents,
            is_credit = sale.is_credit,
            "Inserting sale"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO sales (sold_at, user_id, client_id, total_cents, is_credit)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Utc::now())
        .bind(sale.user_id)
        .bind(sale.client_id)
        .bind(sale.total_cents)
        .bind(sale.is_credit)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Inserts one sale line. A zero subtotal is filled in as
    /// `quantity × unit_price`.
    pub async fn insert_line_in(
        conn: &mut SqliteConnection,
        sale_id: i64,
        line: &NewSaleLine,
    ) -> DbResult<i64> {
        debug!(sale_id, product_id = line.product_id, quantity = line.quantity, "Adding sale line");

        let subtotal = line.resolved_subtotal().ok_or_else(|| {
            DbError::CheckViolation(format!("subtotal of product {} out of range", line.product_id))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO sale_lines (sale_id, product_id, quantity, unit_price_cents, subtotal_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(subtotal.cents())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Gets the raw lines of a sale.
    pub async fn get_lines(&self, sale_id: i64) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lines joined with the product name, for invoices and detail views.
    pub async fn get_line_details(&self, sale_id: i64) -> DbResult<Vec<SaleLineDetail>> {
        let lines = sqlx::query_as::<_, SaleLineDetail>(
            r#"
            SELECT
                l.id,
                l.product_id,
                p.name AS product_name,
                l.quantity,
                l.unit_price_cents,
                l.subtotal_cents
            FROM sale_lines l
            INNER JOIN products p ON p.id = l.product_id
            WHERE l.sale_id = ?1
            ORDER BY l.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Header, client, lines and credit (if any) of one sale.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let client = sqlx::query_as::<_, Client>(
            "SELECT id, first_name, last_name, document, phone, address, email FROM clients WHERE id = ?1",
        )
        .bind(sale.client_id)
        .fetch_one(&self.pool)
        .await?;

        let lines = self.get_line_details(id).await?;
        let credit = CreditRepository::new(self.pool.clone()).find_by_sale(id).await?;

        Ok(Some(SaleDetail {
            sale,
            client,
            lines,
            credit,
        }))
    }

    /// Reassigns the seller and client of a sale. Total and type follow
    /// from the lines and credit and are not editable here.
    pub async fn update_header(&self, id: i64, user_id: i64, client_id: i64) -> DbResult<Sale> {
        let result = sqlx::query("UPDATE sales SET user_id = ?1, client_id = ?2 WHERE id = ?3")
            .bind(user_id)
            .bind(client_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Deletes a sale and its lines in one transaction.
    ///
    /// Stock is not restored. A sale that owns a credit is refused; delete
    /// the credit first.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        Self::delete_in(&mut tx, id).await?;
        tx.commit().await.map_err(DbError::transaction)?;
        Ok(())
    }

    /// Same as [`delete`](Self::delete), inside the caller's transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        let has_credit: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM credits WHERE sale_id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if has_credit > 0 {
            return Err(DbError::still_referenced(format!(
                "sale {id} has a credit; delete the credit first"
            )));
        }

        let lines = sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let header = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if header.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        debug!(sale_id = id, lines = lines.rows_affected(), "Sale deleted");
        Ok(())
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::{seed_basics, test_db};

    async fn insert_cash_sale(db: &Database, user_id: i64, client_id: i64, product_id: i64) -> i64 {
        let mut tx = db.begin().await.unwrap();
        let sale_id = SaleRepository::insert_sale_in(
            &mut tx,
            &NewSale { user_id, client_id, total_cents: 2_000, is_credit: false },
        )
        .await
        .unwrap();
        SaleRepository::insert_line_in(
            &mut tx,
            sale_id,
            &NewSaleLine { product_id, quantity: 2, unit_price_cents: 1_000, subtotal_cents: 0 },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        sale_id
    }

    #[tokio::test]
    async fn test_insert_and_read_detail() {
        let db = test_db().await;
        let (user_id, client_id, product_id) = seed_basics(&db, 10, 1_000).await;
        let sale_id = insert_cash_sale(&db, user_id, client_id, product_id).await;

        let detail = db.sales().get_detail(sale_id).await.unwrap().unwrap();
        assert_eq!(detail.sale.total_cents, 2_000);
        assert!(!detail.sale.is_credit);
        assert_eq!(detail.client.full_name(), "Ana Perez");
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].product_name, "Laptop X");
        // Zero subtotal was computed on insert
        assert_eq!(detail.lines[0].subtotal_cents, 2_000);
        assert!(detail.credit.is_none());

        assert!(db.sales().get_detail(9_999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_lines() {
        let db = test_db().await;
        let (user_id, client_id, product_id) = seed_basics(&db, 10, 1_000).await;
        let sale_id = insert_cash_sale(&db, user_id, client_id, product_id).await;

        db.sales().delete(sale_id).await.unwrap();

        assert!(db.sales().get_by_id(sale_id).await.unwrap().is_none());
        assert!(db.sales().get_lines(sale_id).await.unwrap().is_empty());
        assert!(db.sales().delete(sale_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_update_header() {
        let db = test_db().await;
        let (user_id, client_id, product_id) = seed_basics(&db, 10, 1_000).await;
        let first = insert_cash_sale(&db, user_id, client_id, product_id).await;
        let second = insert_cash_sale(&db, user_id, client_id, product_id).await;

        let ids: Vec<i64> = db.sales().list(10).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);

        let updated = db.sales().update_header(first, user_id, client_id).await.unwrap();
        assert_eq!(updated.id, first);
        assert!(db.sales().update_header(404, user_id, client_id).await.unwrap_err().is_not_found());
    }
}
