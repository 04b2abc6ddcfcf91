//! # Error Types
//!
//! Domain errors raised by pure logic in this crate.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  meridian-core     CoreError, ValidationError   (this file)             │
//! │  meridian-db       DbError, StockError                                  │
//! │  meridian-events   HandlerError                                         │
//! │  meridian-sales    SaleError, ConfigError                               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SaleError → caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

/// Business rule violations detected while pricing a sale.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Discount would push the sale total below zero.
    #[error("Discount {discount} exceeds sale amount {gross}")]
    DiscountExceedsTotal { discount: Money, gross: Money },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Input validation failures.
///
/// Raised before any database work starts, so a sale rejected here never
/// opens a transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A sale was submitted without lines.
    #[error("Sale must have at least one item")]
    EmptySale,

    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not one of the accepted options.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

/// Convenience alias for results carrying [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
