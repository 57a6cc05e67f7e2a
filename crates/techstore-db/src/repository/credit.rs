//! # Credit Repository
//!
//! Credits (one per credit sale) and the payments made against them.
//!
//! ## Balance Invariant
//! ```text
//! 0 <= remaining_balance_cents <= total_balance_cents      (CHECK constraint)
//! status = paid  ⇔  remaining_balance_cents = 0            (payment path)
//! payments.remaining_after_cents = balance right after that payment
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use techstore_core::{Credit, CreditDetail, CreditStatus, NewCredit, Payment};

const CREDIT_COLUMNS: &str =
    "id, sale_id, total_balance_cents, remaining_balance_cents, due_date, status";

/// Repository for credit and payment operations.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    /// Creates a new CreditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Opens a credit for a sale with the full amount still owed.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the sale already has a credit
    pub async fn insert_in(conn: &mut SqliteConnection, credit: &NewCredit) -> DbResult<i64> {
        debug!(
            sale_id = credit.sale_id,
            total_cents = credit.total_balance_cents,
            due_date = %credit.due_date,
            "Opening credit"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO credits (
                sale_id, total_balance_cents, remaining_balance_cents, due_date, status
            ) VALUES (?1, ?2, ?2, ?3, ?4)
            "#,
        )
        .bind(credit.sale_id)
        .bind(credit.total_balance_cents)
        .bind(credit.due_date)
        .bind(CreditStatus::Current)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("credits.sale_id", credit.sale_id.to_string())
            }
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Pool variant of [`insert_in`](Self::insert_in).
    pub async fn insert(&self, credit: &NewCredit) -> DbResult<Credit> {
        let mut conn = self.pool.acquire().await?;
        let id = Self::insert_in(&mut conn, credit).await?;
        Self::get_by_id_in(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Credit", id))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Credit>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Reads a credit inside the caller's transaction.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Credit>> {
        let sql = format!("SELECT {CREDIT_COLUMNS} FROM credits WHERE id = ?1");
        let credit = sqlx::query_as::<_, Credit>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(credit)
    }

    /// The credit opened for a sale, if the sale was on credit.
    pub async fn find_by_sale(&self, sale_id: i64) -> DbResult<Option<Credit>> {
        let sql = format!("SELECT {CREDIT_COLUMNS} FROM credits WHERE sale_id = ?1");
        let credit = sqlx::query_as::<_, Credit>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(credit)
    }

    /// All credits, by due date.
    pub async fn list(&self) -> DbResult<Vec<Credit>> {
        let sql = format!("SELECT {CREDIT_COLUMNS} FROM credits ORDER BY due_date, id");
        let credits = sqlx::query_as::<_, Credit>(&sql).fetch_all(&self.pool).await?;

        Ok(credits)
    }

    /// Credits still owed (current or overdue), by due date.
    pub async fn list_pending(&self) -> DbResult<Vec<Credit>> {
        let sql = format!(
            "SELECT {CREDIT_COLUMNS} FROM credits \
             WHERE status IN ('current', 'overdue') \
             ORDER BY due_date, id"
        );
        let credits = sqlx::query_as::<_, Credit>(&sql).fetch_all(&self.pool).await?;

        Ok(credits)
    }

    /// Writes a new remaining balance and status.
    pub async fn update_balance_in(
        conn: &mut SqliteConnection,
        id: i64,
        remaining_cents: i64,
        status: CreditStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE credits SET remaining_balance_cents = ?1, status = ?2 WHERE id = ?3",
        )
        .bind(remaining_cents)
        .bind(status)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Credit", id));
        }
        Ok(())
    }

    /// Flags every current credit whose due date is before `today` as
    /// overdue. Returns how many rows changed.
    pub async fn mark_overdue(&self, today: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE credits
            SET status = 'overdue'
            WHERE status = 'current'
              AND remaining_balance_cents > 0
              AND due_date < ?1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        debug!(today = %today, updated = result.rows_affected(), "Overdue sweep");
        Ok(result.rows_affected())
    }

    /// Records a payment with the balance left after it.
    pub async fn insert_payment_in(
        conn: &mut SqliteConnection,
        credit_id: i64,
        amount_cents: i64,
        remaining_after_cents: i64,
    ) -> DbResult<i64> {
        debug!(credit_id, amount_cents, remaining_after_cents, "Recording payment");

        let result = sqlx::query(
            r#"
            INSERT INTO payments (credit_id, paid_at, amount_cents, remaining_after_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(credit_id)
        .bind(Utc::now())
        .bind(amount_cents)
        .bind(remaining_after_cents)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Payments of a credit, oldest first.
    pub async fn list_payments(&self, credit_id: i64) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, credit_id, paid_at, amount_cents, remaining_after_cents
            FROM payments
            WHERE credit_id = ?1
            ORDER BY paid_at, id
            "#,
        )
        .bind(credit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// A credit with its payment history.
    pub async fn get_detail(&self, id: i64) -> DbResult<Option<CreditDetail>> {
        let Some(credit) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let payments = self.list_payments(id).await?;

        Ok(Some(CreditDetail { credit, payments }))
    }

    /// Deletes a credit and its payments in one transaction.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let payments = sqlx::query("DELETE FROM payments WHERE credit_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let credit = sqlx::query("DELETE FROM credits WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if credit.rows_affected() == 0 {
            // tx dropped: nothing deleted
            return Err(DbError::not_found("Credit", id));
        }

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(credit_id = id, payments = payments.rows_affected(), "Credit deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::sale::SaleRepository;
    use crate::repository::test_support::{seed_basics, test_db};
    use techstore_core::NewSale;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn credit_sale(db: &Database, total_cents: i64, due: NaiveDate) -> (i64, i64) {
        let (user_id, client_id, _) = seed_basics(db, 10, 1_000).await;
        let mut tx = db.begin().await.unwrap();
        let sale_id = SaleRepository::insert_sale_in(
            &mut tx,
            &NewSale { user_id, client_id, total_cents, is_credit: true },
        )
        .await
        .unwrap();
        let credit_id = CreditRepository::insert_in(
            &mut tx,
            &NewCredit { sale_id, total_balance_cents: total_cents, due_date: due },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        (sale_id, credit_id)
    }

    #[tokio::test]
    async fn test_insert_starts_fully_owed() {
        let db = test_db().await;
        let (sale_id, credit_id) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let credit = db.credits().get_by_id(credit_id).await.unwrap().unwrap();
        assert_eq!(credit.sale_id, sale_id);
        assert_eq!(credit.total_balance_cents, 1_000);
        assert_eq!(credit.remaining_balance_cents, 1_000);
        assert_eq!(credit.status, CreditStatus::Current);
        assert_eq!(credit.due_date, date(2030, 1, 31));

        let by_sale = db.credits().find_by_sale(sale_id).await.unwrap().unwrap();
        assert_eq!(by_sale.id, credit_id);
    }

    #[tokio::test]
    async fn test_second_credit_for_sale_is_duplicate() {
        let db = test_db().await;
        let (sale_id, _) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let err = db
            .credits()
            .insert(&NewCredit { sale_id, total_balance_cents: 1_000, due_date: date(2030, 2, 1) })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_payments_and_pending_list() {
        let db = test_db().await;
        let (_, credit_id) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let mut tx = db.begin().await.unwrap();
        CreditRepository::insert_payment_in(&mut tx, credit_id, 1_000, 0).await.unwrap();
        CreditRepository::update_balance_in(&mut tx, credit_id, 0, CreditStatus::Paid)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let detail = db.credits().get_detail(credit_id).await.unwrap().unwrap();
        assert_eq!(detail.credit.status, CreditStatus::Paid);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].remaining_after_cents, 0);

        assert!(db.credits().list_pending().await.unwrap().is_empty());
        assert_eq!(db.credits().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_balance_above_total_is_rejected() {
        let db = test_db().await;
        let (_, credit_id) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let mut tx = db.begin().await.unwrap();
        let err = CreditRepository::update_balance_in(&mut tx, credit_id, 5_000, CreditStatus::Current)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation(_)));
    }

    #[tokio::test]
    async fn test_mark_overdue_only_past_due_current() {
        let db = test_db().await;
        let (_, credit_id) = credit_sale(&db, 1_000, date(2024, 1, 31)).await;

        assert_eq!(db.credits().mark_overdue(date(2024, 1, 31)).await.unwrap(), 0);
        assert_eq!(db.credits().mark_overdue(date(2024, 2, 1)).await.unwrap(), 1);

        let credit = db.credits().get_by_id(credit_id).await.unwrap().unwrap();
        assert_eq!(credit.status, CreditStatus::Overdue);
        // Overdue credits still count as pending
        assert_eq!(db.credits().list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_payments() {
        let db = test_db().await;
        let (sale_id, credit_id) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let mut tx = db.begin().await.unwrap();
        CreditRepository::insert_payment_in(&mut tx, credit_id, 400, 600).await.unwrap();
        tx.commit().await.unwrap();

        db.credits().delete(credit_id).await.unwrap();
        assert!(db.credits().get_by_id(credit_id).await.unwrap().is_none());
        assert!(db.credits().list_payments(credit_id).await.unwrap().is_empty());

        // With the credit gone the sale itself can be deleted
        db.sales().delete(sale_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_sale_with_credit_cannot_be_deleted() {
        let db = test_db().await;
        let (sale_id, _) = credit_sale(&db, 1_000, date(2030, 1, 31)).await;

        let err = db.sales().delete(sale_id).await.unwrap_err();
        assert!(matches!(err, DbError::StillReferenced(_)));
        assert!(db.sales().get_by_id(sale_id).await.unwrap().is_some());
    }
}
