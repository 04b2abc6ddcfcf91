//! # Database Error Types
//!
//! `DbError` for storage failures and `StockError` for the Stock Ledger.
//!
//! ## Error Flow
//! ```text
//! sqlx::Error ──► DbError ──┬──► SaleError::Persistence      (meridian-sales)
//!                           └──► StockError::Storage ──► HandlerError
//!                                                        (meridian-events)
//! ```

use meridian_core::{ReconciliationKind, ValidationError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Row lookup or conditional update matched nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// UNIQUE constraint failed (duplicate SKU, transaction number, ...).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint rejected the row.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Input rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// All pooled connections are busy and the acquire timed out.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Maps sqlx errors onto [`DbError`].
///
/// ```text
/// RowNotFound                        → NotFound
/// "UNIQUE constraint failed: t.col"  → UniqueViolation { field: "t.col" }
/// "FOREIGN KEY constraint failed"    → ForeignKeyViolation
/// "CHECK constraint failed"          → ConstraintViolation
/// PoolTimedOut                       → PoolExhausted
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::ConstraintViolation(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Stock Ledger Errors
// =============================================================================

/// Failures of a Stock Ledger operation.
///
/// Every variant means the ledger's transaction was rolled back: no
/// `stock_records` change and no `stock_movements` row is visible.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Stock record not found for product {product_id} at location '{location_id}'")]
    RecordNotFound {
        product_id: String,
        location_id: String,
    },

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Invalid stock operation: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl StockError {
    /// Category recorded on a reconciliation flag.
    pub fn reconciliation_kind(&self) -> ReconciliationKind {
        match self {
            StockError::InsufficientStock { .. } => ReconciliationKind::InsufficientStock,
            StockError::RecordNotFound { .. } => ReconciliationKind::RecordNotFound,
            StockError::Invalid(_) | StockError::Storage(_) => ReconciliationKind::Storage,
        }
    }
}

impl From<sqlx::Error> for StockError {
    fn from(err: sqlx::Error) -> Self {
        StockError::Storage(err.into())
    }
}

pub type StockResult<T> = Result<T, StockError>;
