//! Handler error type.
//!
//! A `HandlerError` is reported to the dispatcher and logged. It never
//! reaches the code that published the event.

use meridian_db::{DbError, StockError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("{0}")]
    Other(String),
}

pub type HandlerResult = Result<(), HandlerError>;
