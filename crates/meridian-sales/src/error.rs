//! # Error Types
//!
//! ```text
//! ValidationError ─┐
//! CoreError ───────┼──► SaleError ──► caller
//! DbError ─────────┘
//!
//! io / toml ──► ConfigError ─┐
//! DbError ───────────────────┴──► StartupError
//! ```

use meridian_core::{CoreError, ValidationError};
use meridian_db::DbError;
use thiserror::Error;

/// Why a sale was not completed. Every variant means nothing was written.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_name: String,
        product_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[source] DbError),
}

impl SaleError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SaleError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<CoreError> for SaleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => SaleError::Validation(v),
            CoreError::DiscountExceedsTotal { gross, .. } => {
                SaleError::Validation(ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: gross.cents(),
                })
            }
        }
    }
}

impl From<DbError> for SaleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SaleError::NotFound { entity, id },
            DbError::Validation(v) => SaleError::Validation(v),
            other => SaleError::Persistence(other),
        }
    }
}

impl From<sqlx::Error> for SaleError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

pub type SaleResult<T> = Result<T, SaleError>;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config directory available on this platform")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failures while bringing up a [`PosRuntime`](crate::PosRuntime).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database startup failed: {0}")]
    Database(#[from] DbError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::Money;

    #[test]
    fn test_messages_distinguish_failures() {
        let empty: SaleError = ValidationError::EmptySale.into();
        assert_eq!(empty.to_string(), "Sale must have at least one item");

        let missing = SaleError::not_found("Product", "p-404");
        assert_eq!(missing.to_string(), "Product not found: p-404");

        let short = SaleError::InsufficientStock {
            product_name: "Cola".into(),
            product_id: "p1".into(),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            short.to_string(),
            "Insufficient stock for Cola: requested 3, available 1"
        );
    }

    #[test]
    fn test_core_and_db_mapping() {
        let err: SaleError = CoreError::DiscountExceedsTotal {
            discount: Money::from_cents(500),
            gross: Money::from_cents(400),
        }
        .into();
        assert!(matches!(err, SaleError::Validation(ValidationError::OutOfRange { max: 400, .. })));

        let err: SaleError = DbError::not_found("Customer", "c1").into();
        assert!(matches!(err, SaleError::NotFound { ref entity, .. } if entity == "Customer"));

        let err: SaleError = DbError::PoolExhausted.into();
        assert!(matches!(err, SaleError::Persistence(_)));
    }
}
