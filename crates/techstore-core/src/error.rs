//! # Error Types
//!
//! `ValidationError` covers malformed input and `CoreError` covers business
//! rules. Neither knows about HTTP; the server maps both into `ApiError`:
//!
//! ```text
//! ValidationError ──► CoreError ──► ApiError (400 / 404 / 422)
//! ```

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// All of these are raised before any mutation, except `InsufficientStock`
/// which can also come back from the conditional stock decrement inside a
/// transaction (the transaction is then rolled back).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id referenced by a sale line does not exist.
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),

    /// Not enough stock to cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Register sale (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Mouse", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// 422 "Insufficient stock for product Mouse (stock=3, requested=5)"
    /// ```
    #[error("Insufficient stock for product {product} (stock={available}, requested={requested})")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Sale {0} not found")]
    SaleNotFound(i64),

    #[error("Credit {0} not found")]
    CreditNotFound(i64),

    /// Role id on a user record is not one of the known levels.
    #[error("Unknown role id {0}")]
    UnknownRole(i64),

    /// Zero, negative, or more than the remaining balance.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    #[error("Credit {0} is already paid")]
    CreditAlreadyPaid(i64),

    /// A sale must have at least one line.
    #[error("A sale needs at least one line")]
    EmptySale,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Rejected input, reported per field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing, or only whitespace.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Malformed email, phone number or date.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date that has to be today or later.
    #[error("{field} {date} is in the past (today is {today})")]
    DateInPast {
        field: String,
        date: NaiveDate,
        today: NaiveDate,
    },

    /// A computed amount does not fit in `i64` cents.
    #[error("{field} exceeds the largest supported amount")]
    AmountTooLarge { field: String },

    /// Quantity on a sale line is zero or negative.
    #[error("Invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: i64 },

    /// Username already taken, or a client document already registered.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_product_and_quantities() {
        let err = CoreError::InsufficientStock {
            product: "Mouse".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product Mouse (stock=3, requested=5)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "username".to_string(),
        };
        assert_eq!(err.to_string(), "username is required");

        let err = ValidationError::InvalidQuantity { product_id: 7 };
        assert_eq!(err.to_string(), "Invalid quantity for product 7");

        let err = ValidationError::DateInPast {
            field: "due_date".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            today: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        };
        assert_eq!(err.to_string(), "due_date 2024-03-09 is in the past (today is 2024-03-10)");
    }

    #[test]
    fn test_already_paid_is_not_a_validation_error() {
        let err = CoreError::CreditAlreadyPaid(4);
        assert_eq!(err.to_string(), "Credit 4 is already paid");
        assert!(!matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
