//! # techstore-core: Pure Business Logic for TechStore
//!
//! Every rule that can be expressed without touching the database lives here:
//! entity types, integer money, role levels, sale line arithmetic and the
//! credit repayment rule.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TechStore Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/server (axum handlers)                     │   │
//! │  │     login ──► menu ──► register sale ──► reports (HTML/PDF)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ techstore-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ │   │
//! │  │   │  types  │ │  money  │ │ access  │ │  sale   │ │validation│ │   │
//! │  │   │ Product │ │  Money  │ │ Level1  │ │ lines   │ │  rules   │ │   │
//! │  │   │ Credit  │ │   VAT   │ │ Level2  │ │ credit  │ │          │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 techstore-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records, input records and report rows
//! - [`money`] - Money type with integer arithmetic
//! - [`access`] - Role id to access level mapping
//! - [`sale`] - Sale line drafts, stock checks and the payment rule
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use techstore_core::money::Money;
//! use techstore_core::sale::apply_payment;
//! use techstore_core::CreditStatus;
//!
//! let outcome = apply_payment(Money::from_cents(1000), Money::from_cents(400)).unwrap();
//! assert_eq!(outcome.remaining.cents(), 600);
//! assert_eq!(outcome.status, CreditStatus::Current);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessLevel, ROLE_ADMIN_ID, ROLE_OCCASIONAL_ID, ROLE_OPERATOR_ID};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in one sale line.
///
/// Guards against typing 1000 instead of 10 at the counter.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Largest unit price accepted for a product ($1,000,000,000.00).
///
/// Keeps `MAX_SALE_LINES × MAX_LINE_QUANTITY × price` inside `i64` cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Maximum number of lines in a single sale.
pub const MAX_SALE_LINES: usize = 200;

/// Note recorded on a session log when the caller does not give one.
pub const DEFAULT_LOGIN_NOTE: &str = "Login";

/// Minimum length for staff passwords.
pub const MIN_PASSWORD_LENGTH: usize = 8;
