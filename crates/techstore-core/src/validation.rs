//! # Validation Module
//!
//! Input validation utilities for TechStore.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: axum extractors                                               │
//! │  └── Type validation (JSON / form / query deserialization)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services (Rust)                                               │
//! │  └── THIS MODULE: field rules, before any mutation                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE username (NOCASE)                                           │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use techstore_core::validation::{validate_username, validate_password};
//!
//! validate_username("jperez").unwrap();
//! assert!(validate_password("short").is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{NewCategory, NewClient, NewProduct, NewSupplier, NewUser};
use crate::{MAX_PRICE_CENTS, MAX_SALE_LINES, MIN_PASSWORD_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value of at most `max` characters.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Optional text: blank is fine, but not longer than `max`.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a login name.
///
/// ## Rules
/// - 3 to 50 characters
/// - Letters, digits, dot, hyphen, underscore
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, dots, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a new password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password.len() > 256 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 256,
        });
    }

    Ok(())
}

/// Loose email shape check: one `@`, something on both sides, a dot after.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price in cents: `0..=MAX_PRICE_CENTS`.
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

/// Validates a stock level. Must not be negative.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a payment amount in cents.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// Caps the number of lines in one sale.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "sale lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }
    Ok(())
}

pub fn validate_month(month: u32) -> ValidationResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }
    Ok(())
}

pub fn validate_quarter(quarter: u32) -> ValidationResult<()> {
    if !(1..=4).contains(&quarter) {
        return Err(ValidationError::OutOfRange {
            field: "quarter".to_string(),
            min: 1,
            max: 4,
        });
    }
    Ok(())
}

/// Years outside 2000..=2100 are almost certainly typos.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(2000..=2100).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 2000,
            max: 2100,
        });
    }
    Ok(())
}

/// Both bounds optional; when both are given, `from <= to`.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("start {} is after end {}", from, to),
            });
        }
    }
    Ok(())
}

/// A credit's due date may be today but not earlier.
pub fn validate_due_date(due: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if due < today {
        return Err(ValidationError::DateInPast {
            field: "due_date".to_string(),
            date: due,
            today,
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_required("first_name", &user.first_name, 100)?;
    validate_optional("last_name", Some(&user.last_name), 100)?;
    validate_username(&user.username)
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_required("first_name", &client.first_name, 100)?;
    validate_optional("last_name", Some(&client.last_name), 100)?;
    validate_optional("document", client.document.as_deref(), 30)?;
    validate_optional("phone", client.phone.as_deref(), 30)?;
    validate_optional("address", client.address.as_deref(), 200)?;
    validate_email(client.email.as_deref())
}

pub fn validate_new_category(category: &NewCategory) -> ValidationResult<()> {
    validate_required("name", &category.name, 100)?;
    validate_optional("description", category.description.as_deref(), 500)
}

pub fn validate_new_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    validate_required("name", &supplier.name, 150)?;
    validate_optional("phone", supplier.phone.as_deref(), 30)?;
    validate_optional("address", supplier.address.as_deref(), 200)?;
    validate_email(supplier.email.as_deref())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_required("name", &product.name, 200)?;
    validate_optional("description", product.description.as_deref(), 1000)?;
    validate_price_cents("purchase_price", product.purchase_price_cents)?;
    validate_price_cents("sale_price", product.sale_price_cents)?;
    validate_stock(product.stock)
}

// =============================================================================
// Unit Tests
// =============================================================================
