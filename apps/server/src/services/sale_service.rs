//! Sale service.
//!
//! Registers cash and credit sales and credit payments.
//!
//! ## Registration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Registration                                    │
//! │                                                                         │
//! │  1. VALIDATE (no writes)                                                │
//! │     └── at least one line, quantity > 0                                 │
//! │     └── client exists, every product exists                             │
//! │     └── stock covers the quantity (summed per product)                  │
//! │                                                                         │
//! │  2. PRICE                                                               │
//! │     └── unit price = current sale price, subtotal = q × price           │
//! │     └── total = Σ subtotal                                              │
//! │                                                                         │
//! │  3. ONE TRANSACTION                                                     │
//! │     └── INSERT sale, INSERT lines                                       │
//! │     └── UPDATE stock = stock - q WHERE stock >= q  (0 rows → abort)     │
//! │     └── INSERT credit (credit sales only)                               │
//! │     └── COMMIT  (any early return drops the tx → ROLLBACK)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use techstore_core::sale::{apply_payment, check_stock, draft_line, resolve_total, validate_line_requests, LineRequest};
use techstore_core::validation::{validate_due_date, validate_payment_amount};
use techstore_core::{
    CoreError, Credit, CreditDetail, CreditStatus, Money, NewCredit, NewSale, Product, Sale, SaleDetail,
};
use techstore_db::{CreditRepository, Database, DbError, ProductRepository, SaleRepository};

use crate::error::{ApiError, ApiResult};

/// Result of a recorded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub remaining: Money,
    pub status: CreditStatus,
}

/// Sale and credit workflows.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    /// Registers a cash sale. Returns the sale id.
    pub async fn register_cash_sale(
        &self,
        user_id: i64,
        client_id: i64,
        lines: &[LineRequest],
    ) -> ApiResult<i64> {
        let (sale_id, _) = self.register(user_id, client_id, lines, None).await?;
        Ok(sale_id)
    }

    /// Registers a credit sale and its credit. Returns `(sale_id, credit_id)`.
    pub async fn register_credit_sale(
        &self,
        user_id: i64,
        client_id: i64,
        lines: &[LineRequest],
        due_date: NaiveDate,
    ) -> ApiResult<(i64, i64)> {
        validate_due_date(due_date, Utc::now().date_naive())?;

        let (sale_id, credit_id) = self.register(user_id, client_id, lines, Some(due_date)).await?;
        let credit_id = credit_id.ok_or_else(|| ApiError::internal("Credit was not created"))?;
        Ok((sale_id, credit_id))
    }

    async fn register(
        &self,
        user_id: i64,
        client_id: i64,
        lines: &[LineRequest],
        due_date: Option<NaiveDate>,
    ) -> ApiResult<(i64, Option<i64>)> {
        validate_line_requests(lines)?;

        if self.db.clients().get_by_id(client_id).await?.is_none() {
            return Err(ApiError::not_found("Client", client_id));
        }
        if self.db.users().get_by_id(user_id).await?.is_none() {
            return Err(ApiError::not_found("User", user_id));
        }

        // Price every line against the current product rows
        let mut products: HashMap<i64, Product> = HashMap::new();
        let mut requested: HashMap<i64, i64> = HashMap::new();
        let mut drafts = Vec::with_capacity(lines.len());

        for line in lines {
            if !products.contains_key(&line.product_id) {
                let product = self
                    .db
                    .products()
                    .get_by_id(line.product_id)
                    .await?
                    .ok_or(CoreError::ProductNotFound(line.product_id))?;
                products.insert(line.product_id, product);
            }
            let product = &products[&line.product_id];

            drafts.push(draft_line(product, line)?);

            // The same product on two lines must fit in stock together
            let total = requested.entry(line.product_id).or_insert(0);
            *total += line.quantity;
            check_stock(product, *total)?;
        }

        let total = resolve_total(None, &drafts)?;
        let is_credit = due_date.is_some();

        let mut tx = self.db.begin().await?;

        let sale_id = SaleRepository::insert_sale_in(
            &mut tx,
            &NewSale {
                user_id,
                client_id,
                total_cents: total.cents(),
                is_credit,
            },
        )
        .await?;

        for draft in &drafts {
            SaleRepository::insert_line_in(&mut tx, sale_id, &draft.to_new_line()).await?;

            let taken =
                ProductRepository::decrement_stock_if_available(&mut tx, draft.product_id, draft.quantity)
                    .await?;
            if !taken {
                // Another sale got there first; tx is dropped and rolled back
                let available = ProductRepository::get_by_id_in(&mut tx, draft.product_id)
                    .await?
                    .map(|p| p.stock)
                    .unwrap_or(0);
                warn!(
                    product_id = draft.product_id,
                    available,
                    requested = draft.quantity,
                    "Stock changed during sale registration"
                );
                return Err(CoreError::InsufficientStock {
                    product: draft.product_name.clone(),
                    available,
                    requested: draft.quantity,
                }
                .into());
            }
        }

        let credit_id = match due_date {
            Some(due_date) => Some(
                CreditRepository::insert_in(
                    &mut tx,
                    &NewCredit {
                        sale_id,
                        total_balance_cents: total.cents(),
                        due_date,
                    },
                )
                .await?,
            ),
            None => None,
        };

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            sale_id,
            client_id,
            lines = drafts.len(),
            total = %total,
            is_credit,
            "Sale registered"
        );
        Ok((sale_id, credit_id))
    }

    /// Applies a payment to a credit.
    pub async fn register_payment(&self, credit_id: i64, amount: Money) -> ApiResult<PaymentReceipt> {
        validate_payment_amount(amount.cents())?;

        let mut tx = self.db.begin().await?;

        let credit = CreditRepository::get_by_id_in(&mut tx, credit_id)
            .await?
            .ok_or(CoreError::CreditNotFound(credit_id))?;

        if credit.status == CreditStatus::Paid || credit.remaining_balance().is_zero() {
            return Err(CoreError::CreditAlreadyPaid(credit_id).into());
        }

        let outcome = apply_payment(credit.remaining_balance(), amount)?;

        let payment_id =
            CreditRepository::insert_payment_in(&mut tx, credit_id, outcome.amount.cents(), outcome.remaining.cents())
                .await?;
        CreditRepository::update_balance_in(&mut tx, credit_id, outcome.remaining.cents(), outcome.status).await?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            credit_id,
            payment_id,
            amount = %outcome.amount,
            remaining = %outcome.remaining,
            status = outcome.status.as_str(),
            "Payment registered"
        );

        Ok(PaymentReceipt {
            payment_id,
            remaining: outcome.remaining,
            status: outcome.status,
        })
    }

    pub async fn sale_detail(&self, sale_id: i64) -> ApiResult<SaleDetail> {
        self.db
            .sales()
            .get_detail(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id).into())
    }

    pub async fn list_sales(&self, limit: u32) -> ApiResult<Vec<Sale>> {
        Ok(self.db.sales().list(limit).await?)
    }

    /// Deletes a sale and its lines. Stock is not given back.
    pub async fn delete_sale(&self, sale_id: i64) -> ApiResult<()> {
        self.db.sales().delete(sale_id).await.map_err(|e| match e {
            DbError::NotFound { .. } => ApiError::from(CoreError::SaleNotFound(sale_id)),
            other => ApiError::from(other),
        })?;
        info!(sale_id, "Sale deleted");
        Ok(())
    }

    pub async fn credit_detail(&self, credit_id: i64) -> ApiResult<CreditDetail> {
        self.db
            .credits()
            .get_detail(credit_id)
            .await?
            .ok_or_else(|| CoreError::CreditNotFound(credit_id).into())
    }

    pub async fn pending_credits(&self) -> ApiResult<Vec<Credit>> {
        Ok(self.db.credits().list_pending().await?)
    }

    /// Deletes a credit and its payments.
    pub async fn delete_credit(&self, credit_id: i64) -> ApiResult<()> {
        self.db.credits().delete(credit_id).await.map_err(|e| match e {
            DbError::NotFound { .. } => ApiError::from(CoreError::CreditNotFound(credit_id)),
            other => ApiError::from(other),
        })?;
        info!(credit_id, "Credit deleted");
        Ok(())
    }

    /// Flags current credits whose due date has passed. Returns how many
    /// changed.
    pub async fn mark_overdue_credits(&self, today: NaiveDate) -> ApiResult<u64> {
        let changed = self.db.credits().mark_overdue(today).await?;
        info!(%today, changed, "Overdue credits marked");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::test_support::{add_product, seed_catalog, seed_staff, test_db, user_id};
    use chrono::Duration;

    fn line(product_id: i64, quantity: i64) -> LineRequest {
        LineRequest { product_id, quantity }
    }

    fn next_month() -> NaiveDate {
        Utc::now().date_naive() + Duration::days(30)
    }

    async fn setup(stock: i64, price_cents: i64) -> (Database, SaleService, i64, i64, i64) {
        let db = test_db().await;
        seed_staff(&db).await;
        let (client_id, product_id) = seed_catalog(&db, stock, price_cents).await;
        let seller = user_id(&db, "olga").await;
        (db.clone(), SaleService::new(db), seller, client_id, product_id)
    }

    async fn stock_of(db: &Database, product_id: i64) -> i64 {
        db.products().get_by_id(product_id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_stock_scenario_10_then_3_3_then_4() {
        let (db, sales, seller, client, product) = setup(10, 1_000).await;

        sales.register_cash_sale(seller, client, &[line(product, 3)]).await.unwrap();
        sales.register_cash_sale(seller, client, &[line(product, 3)]).await.unwrap();
        assert_eq!(stock_of(&db, product).await, 4);

        let err = sales
            .register_cash_sale(seller, client, &[line(product, 5)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock for product Mouse (stock=4, requested=5)");
        assert_eq!(stock_of(&db, product).await, 4);
        assert_eq!(db.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_totals_and_subtotals() {
        let (db, sales, seller, client, mouse) = setup(10, 1_250).await;
        let cable = add_product(&db, "Cable", 20, 499).await;

        let sale_id = sales
            .register_cash_sale(seller, client, &[line(mouse, 2), line(cable, 3)])
            .await
            .unwrap();

        let detail = sales.sale_detail(sale_id).await.unwrap();
        assert!(!detail.sale.is_credit);
        assert!(detail.credit.is_none());
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].unit_price_cents, 1_250);
        assert_eq!(detail.lines[0].subtotal_cents, 2_500);
        assert_eq!(detail.lines[1].subtotal_cents, 1_497);
        assert_eq!(detail.sale.total_cents, 3_997);

        assert_eq!(stock_of(&db, mouse).await, 8);
        assert_eq!(stock_of(&db, cable).await, 17);
    }

    #[tokio::test]
    async fn test_failed_line_leaves_everything_unchanged() {
        let (db, sales, seller, client, mouse) = setup(10, 1_000).await;
        let scarce = add_product(&db, "Scarce", 1, 500).await;

        let err = sales
            .register_cash_sale(seller, client, &[line(mouse, 2), line(scarce, 2)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        assert_eq!(stock_of(&db, mouse).await, 10);
        assert_eq!(stock_of(&db, scarce).await, 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_product_on_two_lines_is_summed() {
        let (db, sales, seller, client, product) = setup(5, 1_000).await;

        let err = sales
            .register_cash_sale(seller, client, &[line(product, 3), line(product, 3)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(stock_of(&db, product).await, 5);
    }

    #[tokio::test]
    async fn test_validation_before_mutation() {
        let (db, sales, seller, client, product) = setup(5, 1_000).await;

        let err = sales.register_cash_sale(seller, client, &[]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = sales
            .register_cash_sale(seller, client, &[line(product, 0)])
            .await
            .unwrap_err();
        assert_eq!(err.message, format!("Invalid quantity for product {product}"));

        let err = sales
            .register_cash_sale(seller, client, &[line(999, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Product 999 does not exist");

        let err = sales
            .register_cash_sale(seller, 4040, &[line(product, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(stock_of(&db, product).await, 5);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_scenario_1000_400_600() {
        let (db, sales, seller, client, product) = setup(10, 500).await;

        let (sale_id, credit_id) = sales
            .register_credit_sale(seller, client, &[line(product, 2)], next_month())
            .await
            .unwrap();

        let credit = db.credits().get_by_id(credit_id).await.unwrap().unwrap();
        assert_eq!(credit.sale_id, sale_id);
        assert_eq!(credit.total_balance_cents, 1_000);
        assert_eq!(credit.remaining_balance_cents, 1_000);
        assert_eq!(credit.status, CreditStatus::Current);
        assert!(sales.sale_detail(sale_id).await.unwrap().sale.is_credit);

        let first = sales.register_payment(credit_id, Money::from_cents(400)).await.unwrap();
        assert_eq!(first.remaining.cents(), 600);
        assert_eq!(first.status, CreditStatus::Current);

        let second = sales.register_payment(credit_id, Money::from_cents(600)).await.unwrap();
        assert_eq!(second.remaining.cents(), 0);
        assert_eq!(second.status, CreditStatus::Paid);

        let detail = sales.credit_detail(credit_id).await.unwrap();
        assert_eq!(detail.payments.len(), 2);
        assert_eq!(detail.payments[0].remaining_after_cents, 600);
        assert_eq!(detail.payments[1].remaining_after_cents, 0);

        let err = sales.register_payment(credit_id, Money::from_cents(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert_eq!(err.message, format!("Credit {credit_id} is already paid"));
    }

    #[tokio::test]
    async fn test_overpayment_floors_at_zero() {
        let (_db, sales, seller, client, product) = setup(10, 500).await;
        let (_, credit_id) = sales
            .register_credit_sale(seller, client, &[line(product, 1)], next_month())
            .await
            .unwrap();

        let receipt = sales.register_payment(credit_id, Money::from_cents(9_999)).await.unwrap();
        assert_eq!(receipt.remaining, Money::zero());
        assert_eq!(receipt.status, CreditStatus::Paid);
    }

    #[tokio::test]
    async fn test_payment_validation() {
        let (_db, sales, seller, client, product) = setup(10, 500).await;
        let (_, credit_id) = sales
            .register_credit_sale(seller, client, &[line(product, 1)], next_month())
            .await
            .unwrap();

        let err = sales.register_payment(credit_id, Money::zero()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = sales.register_payment(credit_id, Money::from_cents(-5)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = sales.register_payment(777, Money::from_cents(100)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_credit_sale_rejects_past_due_date() {
        let (db, sales, seller, client, product) = setup(10, 500).await;
        let yesterday = Utc::now().date_naive() - Duration::days(1);

        let err = sales
            .register_credit_sale(seller, client, &[line(product, 1)], yesterday)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(
            err.message,
            format!("due_date {} is in the past (today is {})", yesterday, Utc::now().date_naive())
        );
        assert_eq!(stock_of(&db, product).await, 10);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overflowing_price_is_rejected_before_mutation() {
        // Written straight to the table, past the price cap
        let (db, sales, seller, client, product) = setup(10, 4_000_000_000_000_000_000).await;

        let err = sales
            .register_cash_sale(seller, client, &[line(product, 3)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(
            err.message,
            format!("subtotal for product {product} exceeds the largest supported amount")
        );
        assert_eq!(stock_of(&db, product).await, 10);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stock_taken_during_registration_rolls_back() {
        let (db, sales, seller, client, product) = setup(10, 1_000).await;

        // Empties the shelf between the stock check and the decrement
        sqlx::query(
            "CREATE TRIGGER drain_stock BEFORE INSERT ON sale_lines \
             BEGIN UPDATE products SET stock = 0 WHERE id = NEW.product_id; END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = sales
            .register_cash_sale(seller, client, &[line(product, 2)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock for product Mouse (stock=0, requested=2)");

        assert_eq!(db.sales().count().await.unwrap(), 0);
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(lines, 0);
        assert_eq!(stock_of(&db, product).await, 10);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (db, sales, seller, client, product) = setup(10, 500).await;

        let cash = sales.register_cash_sale(seller, client, &[line(product, 1)]).await.unwrap();
        sales.delete_sale(cash).await.unwrap();
        assert!(db.sales().get_lines(cash).await.unwrap().is_empty());
        assert_eq!(sales.delete_sale(cash).await.unwrap_err().code, ErrorCode::NotFound);

        let (credit_sale, credit_id) = sales
            .register_credit_sale(seller, client, &[line(product, 1)], next_month())
            .await
            .unwrap();
        sales.register_payment(credit_id, Money::from_cents(100)).await.unwrap();

        // The sale owns a credit
        assert_eq!(sales.delete_sale(credit_sale).await.unwrap_err().code, ErrorCode::Conflict);

        sales.delete_credit(credit_id).await.unwrap();
        assert!(db.credits().list_payments(credit_id).await.unwrap().is_empty());
        sales.delete_sale(credit_sale).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_overdue_then_payment_returns_to_current() {
        let (db, sales, seller, client, product) = setup(10, 500).await;
        let due = Utc::now().date_naive();
        let (_, credit_id) = sales
            .register_credit_sale(seller, client, &[line(product, 2)], due)
            .await
            .unwrap();

        assert_eq!(sales.mark_overdue_credits(due).await.unwrap(), 0);
        assert_eq!(sales.mark_overdue_credits(due + Duration::days(1)).await.unwrap(), 1);
        let credit = db.credits().get_by_id(credit_id).await.unwrap().unwrap();
        assert_eq!(credit.status, CreditStatus::Overdue);
        assert_eq!(sales.pending_credits().await.unwrap().len(), 1);

        let receipt = sales.register_payment(credit_id, Money::from_cents(200)).await.unwrap();
        assert_eq!(receipt.status, CreditStatus::Current);
    }
}
