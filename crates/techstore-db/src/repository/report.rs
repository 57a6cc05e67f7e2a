//! # Report Repository
//!
//! Read-only aggregate queries behind the report pages and PDFs. Nothing
//! here is cached; each call re-reads the tables.
//!
//! ## Date Handling
//! `sold_at` is stored as RFC 3339 UTC text, so `date(sold_at)` yields the
//! UTC calendar day. Month and quarter reports use half-open ranges
//! `[first_day, first_day_of_next_period)` on that day.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use techstore_core::{
    DailySalesRow, InventoryByCategoryRow, MonthlySalesRow, OutstandingCreditRow, OverdueClientRow,
    SalesByTypeRow, SessionLogEntryRow,
};

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales count and total per day, oldest day first.
    ///
    /// Either bound may be omitted; both are inclusive.
    pub async fn daily_sales_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<DailySalesRow>> {
        debug!(?from, ?to, "Daily sales summary");

        let rows = sqlx::query_as::<_, DailySalesRow>(
            r#"
            SELECT
                date(sold_at)               AS day,
                COUNT(*)                    AS sale_count,
                COALESCE(SUM(total_cents), 0) AS total_cents
            FROM sales
            WHERE (?1 IS NULL OR date(sold_at) >= ?1)
              AND (?2 IS NULL OR date(sold_at) <= ?2)
            GROUP BY date(sold_at)
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Credits still owed, with the client's full name, by due date.
    pub async fn outstanding_credits(&self) -> DbResult<Vec<OutstandingCreditRow>> {
        let rows = sqlx::query_as::<_, OutstandingCreditRow>(
            r#"
            SELECT
                c.id                                   AS credit_id,
                c.sale_id                              AS sale_id,
                TRIM(cl.first_name || ' ' || cl.last_name) AS client_name,
                c.total_balance_cents,
                c.remaining_balance_cents,
                c.due_date,
                c.status
            FROM credits c
            INNER JOIN sales s ON s.id = c.sale_id
            INNER JOIN clients cl ON cl.id = s.client_id
            WHERE c.status IN ('current', 'overdue')
            ORDER BY c.due_date, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The latest `limit` session log rows with the username, newest first.
    pub async fn recent_session_logs(&self, limit: u32) -> DbResult<Vec<SessionLogEntryRow>> {
        let rows = sqlx::query_as::<_, SessionLogEntryRow>(
            r#"
            SELECT
                b.id,
                u.username,
                b.login_at,
                b.logout_at,
                b.origin,
                b.note
            FROM session_logs b
            INNER JOIN users u ON u.id = b.user_id
            ORDER BY b.login_at DESC, b.id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every sale of one calendar month, in order.
    pub async fn monthly_sales(&self, year: i32, month: u32) -> DbResult<Vec<MonthlySalesRow>> {
        let (start, end) = month_bounds(year, month)?;

        let rows = sqlx::query_as::<_, MonthlySalesRow>(
            r#"
            SELECT
                s.id                                   AS sale_id,
                s.sold_at,
                TRIM(cl.first_name || ' ' || cl.last_name) AS client_name,
                s.is_credit,
                s.total_cents
            FROM sales s
            INNER JOIN clients cl ON cl.id = s.client_id
            WHERE date(s.sold_at) >= ?1 AND date(s.sold_at) < ?2
            ORDER BY s.sold_at, s.id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Count and total of cash sales and of credit sales in a range.
    ///
    /// Always returns two rows, cash first, zero-filled when a type has no
    /// sales.
    pub async fn sales_by_type(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<SalesByTypeRow>> {
        let found = sqlx::query_as::<_, SalesByTypeRow>(
            r#"
            SELECT
                is_credit,
                COUNT(*)                      AS sale_count,
                COALESCE(SUM(total_cents), 0) AS total_cents
            FROM sales
            WHERE (?1 IS NULL OR date(sold_at) >= ?1)
              AND (?2 IS NULL OR date(sold_at) <= ?2)
            GROUP BY is_credit
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let rows = [false, true]
            .into_iter()
            .map(|is_credit| {
                found
                    .iter()
                    .find(|r| r.is_credit == is_credit)
                    .cloned()
                    .unwrap_or(SalesByTypeRow {
                        is_credit,
                        sale_count: 0,
                        total_cents: 0,
                    })
            })
            .collect();

        Ok(rows)
    }

    /// Product count, units and stock value (at purchase price) per
    /// category. Empty categories are included.
    pub async fn inventory_by_category(&self) -> DbResult<Vec<InventoryByCategoryRow>> {
        let rows = sqlx::query_as::<_, InventoryByCategoryRow>(
            r#"
            SELECT
                c.id                                                AS category_id,
                c.name                                              AS category_name,
                COUNT(p.id)                                         AS product_count,
                COALESCE(SUM(p.stock), 0)                           AS total_units,
                COALESCE(SUM(p.stock * p.purchase_price_cents), 0)  AS stock_value_cents
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY c.name, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Clients in arrears on `today`.
    ///
    /// A credit counts when it still has a balance and is either flagged
    /// overdue or is current with a due date already past. Largest debt
    /// first.
    pub async fn overdue_clients(&self, today: NaiveDate) -> DbResult<Vec<OverdueClientRow>> {
        let rows = sqlx::query_as::<_, OverdueClientRow>(
            r#"
            SELECT
                cl.id                                          AS client_id,
                TRIM(cl.first_name || ' ' || cl.last_name)     AS client_name,
                cl.document,
                COUNT(cr.id)                                   AS credit_count,
                COALESCE(SUM(cr.remaining_balance_cents), 0)   AS remaining_cents,
                MIN(cr.due_date)                               AS oldest_due_date
            FROM credits cr
            INNER JOIN sales s ON s.id = cr.sale_id
            INNER JOIN clients cl ON cl.id = s.client_id
            WHERE cr.remaining_balance_cents > 0
              AND (cr.status = 'overdue' OR (cr.status = 'current' AND cr.due_date < ?1))
            GROUP BY cl.id, cl.first_name, cl.last_name, cl.document
            ORDER BY remaining_cents DESC, cl.id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// `(sale_count, gross_cents)` of a calendar quarter (1..=4).
    pub async fn quarter_sales_total(&self, year: i32, quarter: u32) -> DbResult<(i64, i64)> {
        let (start, end) = quarter_bounds(year, quarter)?;

        let (count, gross): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM sales
            WHERE date(sold_at) >= ?1 AND date(sold_at) < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok((count, gross))
    }
}

/// `[first day of month, first day of next month)`.
fn month_bounds(year: i32, month: u32) -> DbResult<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DbError::QueryFailed(format!("invalid month {year}-{month}")))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| DbError::QueryFailed(format!("invalid month {year}-{month}")))?;

    Ok((start, end))
}

/// `[first day of quarter, first day of next quarter)`.
fn quarter_bounds(year: i32, quarter: u32) -> DbResult<(NaiveDate, NaiveDate)> {
    if !(1..=4).contains(&quarter) {
        return Err(DbError::QueryFailed(format!("invalid quarter {quarter}")));
    }
    let first_month = (quarter - 1) * 3 + 1;
    let (start, _) = month_bounds(year, first_month)?;
    let (_, end) = month_bounds(year, first_month + 2)?;

    Ok((start, end))
}
