//! # Domain Types
//!
//! Core domain types used throughout TechStore.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │   User ──1:N── SessionLog                                               │
//! │    │                                                                    │
//! │    └──1:N── Sale ──1:N── SaleLine ──N:1── Product ──N:1── Category      │
//! │              │  │                           │                           │
//! │   Client ─1:N┘  └──1:1── Credit ──1:N── Payment                         │
//! │                                             └──N:1── Supplier (opt)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity uses a surrogate integer id assigned by the database when the
//! row is inserted. Money fields are stored in cents and exposed as
//! [`Money`] through accessor methods.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// Whether a staff account may log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// A staff account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique, compared case-insensitively.
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub status: UserStatus,
    /// Raw role id; resolve with [`crate::AccessLevel::from_role_id`].
    pub role_id: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Checks if the account may log in.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Input for creating a user. The password travels separately so it is
/// never held next to profile data.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub role_id: i64,
}

// =============================================================================
// Session Log
// =============================================================================

/// Audit record of one login/logout cycle.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionLog {
    pub id: i64,
    pub user_id: i64,
    #[ts(as = "String")]
    pub login_at: DateTime<Utc>,
    /// Set at most once, by the first logout.
    #[ts(as = "Option<String>")]
    pub logout_at: Option<DateTime<Utc>>,
    /// Client address the login came from.
    pub origin: String,
    pub note: String,
}

// =============================================================================
// Catalog: Client, Category, Supplier, Product
// =============================================================================

/// A customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// National id / tax document.
    pub document: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

impl Client {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Cost paid to the supplier, in cents.
    pub purchase_price_cents: i64,
    /// Shelf price, in cents. Snapshotted onto sale lines.
    pub sale_price_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    pub category_id: i64,
    pub supplier_id: Option<i64>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Checks if `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub stock: i64,
    pub category_id: i64,
    pub supplier_id: Option<i64>,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    /// Cashier who registered the sale.
    pub user_id: i64,
    pub client_id: i64,
    pub total_cents: i64,
    /// True when a credit record tracks the balance.
    pub is_credit: bool,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// "CREDIT" or "CASH", as printed on invoices and reports.
    pub fn kind_label(&self) -> &'static str {
        sale_kind_label(self.is_credit)
    }
}

/// Label used for the credit flag on documents.
pub fn sale_kind_label(is_credit: bool) -> &'static str {
    if is_credit {
        "CREDIT"
    } else {
        "CASH"
    }
}

/// Input for inserting a sale header.
///
/// A zero `total_cents` means "compute from the lines".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub user_id: i64,
    pub client_id: i64,
    pub total_cents: i64,
    pub is_credit: bool,
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub subtotal_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Input for inserting a sale line.
///
/// A zero `subtotal_cents` means "quantity × unit price".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl NewSaleLine {
    /// The stored subtotal, computing it when the caller left it at zero.
    /// `None` when quantity × unit price overflows.
    pub fn resolved_subtotal(&self) -> Option<Money> {
        if self.subtotal_cents != 0 {
            Some(Money::from_cents(self.subtotal_cents))
        } else {
            Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
        }
    }
}

/// A sale line joined with the product name, for invoices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLineDetail {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

/// A sale with everything needed to print it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub client: Client,
    pub lines: Vec<SaleLineDetail>,
    pub credit: Option<Credit>,
}

// =============================================================================
// Credit
// =============================================================================

/// Repayment state of a credit.
///
/// ```text
/// current ──► paid (terminal)
///    │          ▲
///    ▼          │
/// overdue ──────┘
///    │
///    └──► current   (partial payment while overdue)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    #[default]
    Current,
    Overdue,
    Paid,
}

impl CreditStatus {
    /// Lowercase name, matching the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Current => "current",
            CreditStatus::Overdue => "overdue",
            CreditStatus::Paid => "paid",
        }
    }

    /// Classifies a credit by balance and due date.
    ///
    /// Used by the overdue sweep only. The payment path never sets
    /// `Overdue`.
    pub fn for_due_date(remaining: Money, due_date: NaiveDate, today: NaiveDate) -> Self {
        if remaining.is_zero() {
            CreditStatus::Paid
        } else if today > due_date {
            CreditStatus::Overdue
        } else {
            CreditStatus::Current
        }
    }

    /// Current or overdue.
    #[inline]
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, CreditStatus::Paid)
    }
}

/// Balance owed on a credit sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Credit {
    pub id: i64,
    /// One credit per sale.
    pub sale_id: i64,
    pub total_balance_cents: i64,
    /// In `[0, total_balance_cents]`.
    pub remaining_balance_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: CreditStatus,
}

impl Credit {
    #[inline]
    pub fn total_balance(&self) -> Money {
        Money::from_cents(self.total_balance_cents)
    }

    #[inline]
    pub fn remaining_balance(&self) -> Money {
        Money::from_cents(self.remaining_balance_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCredit {
    pub sale_id: i64,
    pub total_balance_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
}

/// A repayment towards a credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: i64,
    pub credit_id: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub amount_cents: i64,
    /// Credit balance right after this payment.
    pub remaining_after_cents: i64,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A credit with its payment history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditDetail {
    pub credit: Credit,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Report Rows
// =============================================================================

/// One day of the sales summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailySalesRow {
    /// `YYYY-MM-DD`.
    pub day: String,
    pub sale_count: i64,
    pub total_cents: i64,
}

/// A credit still owed, with the client's name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OutstandingCreditRow {
    pub credit_id: i64,
    pub sale_id: i64,
    pub client_name: String,
    pub total_balance_cents: i64,
    pub remaining_balance_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: CreditStatus,
}

/// A session log entry with the username.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionLogEntryRow {
    pub id: i64,
    pub username: String,
    #[ts(as = "String")]
    pub login_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub logout_at: Option<DateTime<Utc>>,
    pub origin: String,
    pub note: String,
}

/// One sale in the monthly listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MonthlySalesRow {
    pub sale_id: i64,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub client_name: String,
    pub is_credit: bool,
    pub total_cents: i64,
}

/// Cash or credit totals over a period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesByTypeRow {
    pub is_credit: bool,
    pub sale_count: i64,
    pub total_cents: i64,
}

/// Stock position of one category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryByCategoryRow {
    pub category_id: i64,
    pub category_name: String,
    pub product_count: i64,
    pub total_units: i64,
    /// Σ stock × purchase price.
    pub stock_value_cents: i64,
}

/// A client with at least one overdue credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OverdueClientRow {
    pub client_id: i64,
    pub client_name: String,
    pub document: Option<String>,
    pub credit_count: i64,
    pub remaining_cents: i64,
    #[ts(as = "String")]
    pub oldest_due_date: NaiveDate,
}

/// VAT collected in one quarter (prices include VAT).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatQuarterSummary {
    pub year: i32,
    pub quarter: u32,
    pub vat_rate_bps: u32,
    pub sale_count: i64,
    pub gross_cents: i64,
    pub vat_cents: i64,
    pub net_cents: i64,
}

impl VatQuarterSummary {
    /// Splits a VAT-inclusive gross total into net and VAT.
    pub fn from_gross(year: i32, quarter: u32, vat_rate_bps: u32, sale_count: i64, gross: Money) -> Self {
        let vat = gross.included_vat(vat_rate_bps);
        VatQuarterSummary {
            year,
            quarter,
            vat_rate_bps,
            sale_count,
            gross_cents: gross.cents(),
            vat_cents: vat.cents(),
            net_cents: (gross - vat).cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
