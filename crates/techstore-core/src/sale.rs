//! # Sale and Credit Rules
//!
//! The arithmetic half of the sale workflow. The server's sale service
//! fetches products and runs the transaction; everything it decides is
//! decided here.
//!
//! ## Sale Registration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineRequest { product_id, quantity }  × N                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_line_request  ── qty <= 0 ──► "Invalid quantity for product"  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  (fetch product)  ─────── missing ───► "Product {id} does not exist"    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  draft_line  ──────────── stock < qty ► InsufficientStock              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleLineDraft { unit_price = product.sale_price, subtotal = q × p }    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve_total(explicit, drafts) = Σ subtotal                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payment Rule
//! ```text
//! remaining' = max(0, remaining − amount)
//! status'    = paid     if remaining' == 0
//!              current  otherwise   (an overdue credit drops back to current)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CreditStatus, NewSaleLine, Product};
use crate::validation::{validate_line_count, ValidationResult};
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// Line Requests
// =============================================================================

/// One requested line of a sale, as sent by the cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// Rejects non-positive or absurd quantities, naming the product.
pub fn validate_line_request(request: &LineRequest) -> ValidationResult<()> {
    if request.quantity <= 0 {
        return Err(ValidationError::InvalidQuantity {
            product_id: request.product_id,
        });
    }

    if request.quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: format!("quantity for product {}", request.product_id),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the shape of a whole request before any product is fetched.
pub fn validate_line_requests(requests: &[LineRequest]) -> CoreResult<()> {
    if requests.is_empty() {
        return Err(CoreError::EmptySale);
    }
    validate_line_count(requests.len())?;

    for request in requests {
        validate_line_request(request)?;
    }

    Ok(())
}

// =============================================================================
// Line Drafts
// =============================================================================

/// A validated line, priced but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineDraft {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// quantity × unit price, computed once by [`draft_line`].
    pub subtotal: Money,
}

impl SaleLineDraft {
    /// Converts into the insert record for a sale line.
    pub fn to_new_line(&self) -> NewSaleLine {
        NewSaleLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price.cents(),
            subtotal_cents: self.subtotal.cents(),
        }
    }
}

/// Checks that `product` has at least `quantity` units on hand.
pub fn check_stock(product: &Product, quantity: i64) -> CoreResult<()> {
    if !product.can_sell(quantity) {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(())
}

/// Prices one validated request against the current product record.
///
/// The unit price is the product's current sale price; negotiated prices
/// are not supported.
pub fn draft_line(product: &Product, request: &LineRequest) -> CoreResult<SaleLineDraft> {
    validate_line_request(request)?;
    check_stock(product, request.quantity)?;

    let unit_price = product.sale_price();
    let subtotal = unit_price
        .multiply_quantity(request.quantity)
        .ok_or_else(|| ValidationError::AmountTooLarge {
            field: format!("subtotal for product {}", product.id),
        })?;

    Ok(SaleLineDraft {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: request.quantity,
        unit_price,
        subtotal,
    })
}

/// Sale total: the explicit value when non-zero, else Σ subtotal.
pub fn resolve_total(explicit: Option<Money>, drafts: &[SaleLineDraft]) -> CoreResult<Money> {
    match explicit {
        Some(total) if !total.is_zero() => Ok(total),
        _ => Money::checked_sum(drafts.iter().map(|d| d.subtotal)).ok_or_else(|| {
            ValidationError::AmountTooLarge {
                field: "sale total".to_string(),
            }
            .into()
        }),
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Result of applying a payment to a credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub amount: Money,
    pub remaining: Money,
    pub status: CreditStatus,
}

/// Applies `amount` to `remaining`.
///
/// ## Example
/// ```rust
/// use techstore_core::money::Money;
/// use techstore_core::sale::apply_payment;
/// use techstore_core::CreditStatus;
///
/// let first = apply_payment(Money::from_cents(1000), Money::from_cents(400)).unwrap();
/// assert_eq!((first.remaining.cents(), first.status), (600, CreditStatus::Current));
///
/// let second = apply_payment(first.remaining, Money::from_cents(600)).unwrap();
/// assert_eq!((second.remaining.cents(), second.status), (0, CreditStatus::Paid));
/// ```
pub fn apply_payment(remaining: Money, amount: Money) -> CoreResult<PaymentOutcome> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidPaymentAmount {
            reason: "amount must be greater than zero".to_string(),
        });
    }

    let new_remaining = remaining.minus_floor_zero(amount);
    let status = if new_remaining.is_zero() {
        CreditStatus::Paid
    } else {
        CreditStatus::Current
    };

    Ok(PaymentOutcome {
        amount,
        remaining: new_remaining,
        status,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, price_cents: i64, stock: i64) -> Product {
        Product {
            id,
            name: format!("Product {}", id),
            description: None,
            purchase_price_cents: price_cents / 2,
            sale_price_cents: price_cents,
            stock,
            category_id: 1,
            supplier_id: None,
        }
    }

    #[test]
    fn test_validate_line_request() {
        assert!(validate_line_request(&LineRequest { product_id: 1, quantity: 1 }).is_ok());

        let err = validate_line_request(&LineRequest { product_id: 4, quantity: 0 }).unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity for product 4");

        assert!(validate_line_request(&LineRequest { product_id: 4, quantity: -2 }).is_err());
        assert!(validate_line_request(&LineRequest {
            product_id: 4,
            quantity: MAX_LINE_QUANTITY + 1
        })
        .is_err());
    }

    #[test]
    fn test_empty_sale_rejected() {
        assert!(matches!(validate_line_requests(&[]), Err(CoreError::EmptySale)));
    }

    #[test]
    fn test_draft_line_uses_current_price() {
        let p = product(1, 1250, 10);
        let draft = draft_line(&p, &LineRequest { product_id: 1, quantity: 3 }).unwrap();
        assert_eq!(draft.unit_price.cents(), 1250);
        assert_eq!(draft.subtotal.cents(), 3750);
        assert_eq!(draft.to_new_line().subtotal_cents, 3750);
    }

    #[test]
    fn test_draft_line_insufficient_stock() {
        let p = product(1, 1250, 2);
        let err = draft_line(&p, &LineRequest { product_id: 1, quantity: 3 }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product Product 1 (stock=2, requested=3)"
        );
    }

    #[test]
    fn test_resolve_total() {
        let drafts = vec![
            draft_line(&product(1, 100, 10), &LineRequest { product_id: 1, quantity: 2 }).unwrap(),
            draft_line(&product(2, 350, 10), &LineRequest { product_id: 2, quantity: 1 }).unwrap(),
        ];
        assert_eq!(resolve_total(None, &drafts).unwrap().cents(), 550);
        assert_eq!(resolve_total(Some(Money::zero()), &drafts).unwrap().cents(), 550);
        assert_eq!(resolve_total(Some(Money::from_cents(500)), &drafts).unwrap().cents(), 500);
    }

    #[test]
    fn test_overflowing_subtotal_is_rejected() {
        let p = product(1, 4_000_000_000_000_000_000, 10);
        let err = draft_line(&p, &LineRequest { product_id: 1, quantity: 3 }).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let line = |id| SaleLineDraft {
            product_id: id,
            product_name: format!("Product {id}"),
            quantity: 1,
            unit_price: Money::from_cents(i64::MAX),
            subtotal: Money::from_cents(i64::MAX),
        };
        let err = resolve_total(None, &[line(1), line(2)]).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: sale total exceeds the largest supported amount");
    }

    #[test]
    fn test_apply_payment_scenario() {
        let first = apply_payment(Money::from_cents(1000), Money::from_cents(400)).unwrap();
        assert_eq!(first.remaining.cents(), 600);
        assert_eq!(first.status, CreditStatus::Current);

        let second = apply_payment(first.remaining, Money::from_cents(600)).unwrap();
        assert_eq!(second.remaining.cents(), 0);
        assert_eq!(second.status, CreditStatus::Paid);
    }

    #[test]
    fn test_apply_payment_overpay_floors_at_zero() {
        let outcome = apply_payment(Money::from_cents(300), Money::from_cents(1000)).unwrap();
        assert_eq!(outcome.remaining, Money::zero());
        assert_eq!(outcome.status, CreditStatus::Paid);
    }

    #[test]
    fn test_apply_payment_rejects_non_positive() {
        assert!(apply_payment(Money::from_cents(300), Money::zero()).is_err());
        assert!(apply_payment(Money::from_cents(300), Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_partial_payment_never_reports_overdue() {
        // Overdue credits drop back to current on a partial payment.
        for paid in 1..1000 {
            let outcome = apply_payment(Money::from_cents(1000), Money::from_cents(paid)).unwrap();
            assert_eq!(outcome.status, CreditStatus::Current);
            assert!(outcome.remaining.cents() >= 0);
        }
    }
}
