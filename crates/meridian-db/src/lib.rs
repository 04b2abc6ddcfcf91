//! # meridian-db: Database Layer for Meridian POS
//!
//! SQLite storage for the sale-completion pipeline, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Meridian POS Data Flow                             │
//! │                                                                         │
//! │  SaleService (meridian-sales)        Event handlers (meridian-events)   │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     meridian-db (THIS CRATE)                    │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────────┐   ┌────────────────┐   ┌──────────────────┐   │    │
//! │  │   │  Database   │   │  Repositories  │   │   StockLedger    │   │    │
//! │  │   │  (pool.rs)  │◄──│ sale, product, │   │   (ledger.rs)    │   │    │
//! │  │   │             │   │ customer,      │   │ sole writer of   │   │    │
//! │  │   │ SqlitePool  │   │ pattern,       │   │ stock_records +  │   │    │
//! │  │   │ WAL, FKs    │   │ reconciliation │   │ stock_movements  │   │    │
//! │  │   └─────────────┘   └────────────────┘   └──────────────────┘   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (migrations/sqlite/*.sql)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and `StockError`
//! - [`ledger`] - The Stock Ledger
//! - [`repository`] - Sales, catalog, customers, patterns, reconciliation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig, StockUpdate};
//!
//! let db = Database::new(DbConfig::new("meridian.db")).await?;
//!
//! db.ledger()
//!     .bulk_deduct(&[StockUpdate::sale("prod-1", tenant_id, 2)])
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, StockError, StockResult};
pub use ledger::{StockLedger, StockUpdate};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::pattern::PatternRepository;
pub use repository::product::ProductRepository;
pub use repository::reconciliation::ReconciliationRepository;
pub use repository::sale::SaleRepository;
