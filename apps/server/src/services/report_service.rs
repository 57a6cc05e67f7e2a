//! Report service.
//!
//! Validates report parameters and runs the report queries. Every call
//! re-reads the database; rendering to HTML or PDF happens in the routes.

use chrono::NaiveDate;
use tracing::debug;

use techstore_core::validation::{validate_date_range, validate_month, validate_quarter, validate_year};
use techstore_core::{
    DailySalesRow, InventoryByCategoryRow, Money, MonthlySalesRow, OutstandingCreditRow,
    OverdueClientRow, SaleDetail, SalesByTypeRow, SessionLogEntryRow, VatQuarterSummary,
};
use techstore_db::Database;

use crate::config::{ReportSettings, MAX_SESSION_LOG_LIMIT};
use crate::error::ApiResult;
use crate::services::SaleService;

/// Read-only reporting over the store database.
#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(db: Database, settings: ReportSettings) -> Self {
        ReportService { db, settings }
    }

    /// Sales per day, optionally bounded (both ends inclusive).
    pub async fn daily_sales(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<DailySalesRow>> {
        validate_date_range(from, to)?;
        Ok(self.db.reports().daily_sales_summary(from, to).await?)
    }

    /// Credits with a balance left, soonest due first.
    pub async fn outstanding_credits(&self) -> ApiResult<Vec<OutstandingCreditRow>> {
        Ok(self.db.reports().outstanding_credits().await?)
    }

    /// Row count for the session log report: the configured default when
    /// absent, never above [`MAX_SESSION_LOG_LIMIT`].
    pub fn session_log_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.settings.session_log_limit)
            .min(MAX_SESSION_LOG_LIMIT)
    }

    /// Latest logins, newest first.
    pub async fn session_log(&self, limit: Option<u32>) -> ApiResult<Vec<SessionLogEntryRow>> {
        let limit = self.session_log_limit(limit);
        debug!(limit, "Session log report");
        Ok(self.db.reports().recent_session_logs(limit).await?)
    }

    pub async fn monthly_sales(&self, month: u32, year: i32) -> ApiResult<Vec<MonthlySalesRow>> {
        validate_month(month)?;
        validate_year(year)?;
        Ok(self.db.reports().monthly_sales(year, month).await?)
    }

    /// VAT contained in the quarter's sales, at the configured rate.
    pub async fn vat_quarter(&self, quarter: u32, year: i32) -> ApiResult<VatQuarterSummary> {
        validate_quarter(quarter)?;
        validate_year(year)?;

        let (count, gross) = self.db.reports().quarter_sales_total(year, quarter).await?;
        Ok(VatQuarterSummary::from_gross(
            year,
            quarter,
            self.settings.vat_rate_bps,
            count,
            Money::from_cents(gross),
        ))
    }

    /// Cash row first, then credit.
    pub async fn sales_by_type(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<SalesByTypeRow>> {
        validate_date_range(from, to)?;
        Ok(self.db.reports().sales_by_type(from, to).await?)
    }

    pub async fn inventory_by_category(&self) -> ApiResult<Vec<InventoryByCategoryRow>> {
        Ok(self.db.reports().inventory_by_category().await?)
    }

    /// Clients holding credits past due at `today`.
    pub async fn overdue_clients(&self, today: NaiveDate) -> ApiResult<Vec<OverdueClientRow>> {
        Ok(self.db.reports().overdue_clients(today).await?)
    }

    /// Everything the invoice shows.
    pub async fn invoice(&self, sale_id: i64) -> ApiResult<SaleDetail> {
        SaleService::new(self.db.clone()).sale_detail(sale_id).await
    }

    pub fn vat_rate_bps(&self) -> u32 {
        self.settings.vat_rate_bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::test_support::{seed_catalog, seed_staff, test_db, user_id, TEST_PASSWORD};
    use crate::services::AuthService;
    use chrono::{Datelike, Duration, Utc};
    use techstore_core::sale::LineRequest;

    async fn setup() -> (Database, ReportService) {
        let db = test_db().await;
        seed_staff(&db).await;
        (db.clone(), ReportService::new(db, ReportSettings::default()))
    }

    #[tokio::test]
    async fn test_daily_sales_and_range_validation() {
        let (db, reports) = setup().await;
        let (client, product) = seed_catalog(&db, 10, 1_000).await;
        let seller = user_id(&db, "olga").await;
        let sales = SaleService::new(db.clone());

        sales
            .register_cash_sale(seller, client, &[LineRequest { product_id: product, quantity: 2 }])
            .await
            .unwrap();
        sales
            .register_cash_sale(seller, client, &[LineRequest { product_id: product, quantity: 1 }])
            .await
            .unwrap();

        let rows = reports.daily_sales(None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sale_count, 2);
        assert_eq!(rows[0].total_cents, 3_000);

        let today = Utc::now().date_naive();
        let err = reports.daily_sales(Some(today), Some(today - Duration::days(1))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let tomorrow = today + Duration::days(1);
        assert!(reports.daily_sales(Some(tomorrow), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_log_limit_default_and_cap() {
        let (_db, reports) = setup().await;
        assert_eq!(reports.session_log_limit(None), 50);
        assert_eq!(reports.session_log_limit(Some(0)), 50);
        assert_eq!(reports.session_log_limit(Some(7)), 7);
        assert_eq!(reports.session_log_limit(Some(10_000)), MAX_SESSION_LOG_LIMIT);
    }

    #[tokio::test]
    async fn test_session_log_newest_first() {
        let (db, reports) = setup().await;
        let auth = AuthService::new(db);
        auth.login("admin", TEST_PASSWORD, "t", None).await.unwrap().unwrap();
        let last = auth.login("vera", TEST_PASSWORD, "t", None).await.unwrap().unwrap();

        let rows = reports.session_log(Some(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, last.session_log_id);
        assert_eq!(rows[0].username, "vera");
    }

    #[tokio::test]
    async fn test_vat_quarter_uses_configured_rate() {
        let (db, reports) = setup().await;
        let (client, product) = seed_catalog(&db, 10, 11_500).await;
        let seller = user_id(&db, "olga").await;
        SaleService::new(db)
            .register_cash_sale(seller, client, &[LineRequest { product_id: product, quantity: 1 }])
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let quarter = (today.month() - 1) / 3 + 1;
        let summary = reports.vat_quarter(quarter, today.year()).await.unwrap();
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.gross_cents, 11_500);
        assert_eq!(summary.vat_cents, 1_500);
        assert_eq!(summary.net_cents, 10_000);

        assert_eq!(reports.vat_quarter(5, 2024).await.unwrap_err().code, ErrorCode::ValidationError);
        assert_eq!(reports.monthly_sales(13, 2024).await.unwrap_err().code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_outstanding_and_overdue() {
        let (db, reports) = setup().await;
        let (client, product) = seed_catalog(&db, 10, 1_000).await;
        let seller = user_id(&db, "olga").await;
        let today = Utc::now().date_naive();

        SaleService::new(db)
            .register_credit_sale(
                seller,
                client,
                &[LineRequest { product_id: product, quantity: 1 }],
                today,
            )
            .await
            .unwrap();

        let outstanding = reports.outstanding_credits().await.unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].client_name, "Ana Perez");

        assert!(reports.overdue_clients(today).await.unwrap().is_empty());
        let later = reports.overdue_clients(today + Duration::days(1)).await.unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].remaining_cents, 1_000);

        let by_type = reports.sales_by_type(None, None).await.unwrap();
        assert_eq!(by_type.len(), 2);
        assert!(!by_type[0].is_credit);
        assert_eq!(by_type[1].sale_count, 1);
    }
}
