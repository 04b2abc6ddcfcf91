//! # meridian-core: Pure Domain Logic for Meridian POS
//!
//! Every type that crosses a crate boundary in the sale-completion pipeline
//! lives here, together with the arithmetic that must balance.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sale-Completion Pipeline                           │
//! │                                                                         │
//! │  meridian-sales   create_sale ──► commit ──► publish(SaleCompleted)     │
//! │        │                                          │                     │
//! │        ▼                                          ▼                     │
//! │  meridian-db      repositories + Stock Ledger   meridian-events         │
//! │        │                                          │                     │
//! │        └─────────────────┬────────────────────────┘                     │
//! │                          ▼                                              │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │              ★ meridian-core (THIS CRATE) ★                       │ │
//! │  │  money · types · pricing · event · validation · error             │ │
//! │  │  NO I/O • NO DATABASE • NO ASYNC                                  │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer minor units) and `TaxRate` (basis points)
//! - [`types`] - Products, customers, sales, stock records and movements
//! - [`pricing`] - Sale totals, tax policies, loyalty accrual
//! - [`event`] - The `SaleCompletedEvent` wire contract
//! - [`validation`] - Input checks shared by services and repositories
//! - [`error`] - `CoreError` and `ValidationError`
//!
//! ## Example
//!
//! ```rust
//! use meridian_core::money::{Money, TaxRate};
//! use meridian_core::pricing::{compute_totals, PricedLine, TaxPolicy};
//!
//! let lines = vec![
//!     PricedLine::new("A", "Espresso", 2, Money::from_cents(10_000), TaxRate::zero()),
//!     PricedLine::new("B", "Croissant", 1, Money::from_cents(5_000), TaxRate::zero()),
//! ];
//! let totals = compute_totals(&lines, TaxPolicy::PerLine, Money::zero()).unwrap();
//! assert_eq!(totals.subtotal.cents(), 25_000);
//! assert_eq!(totals.total.cents(), 25_000);
//! ```

pub mod error;
pub mod event;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use event::{SaleCompletedEvent, SaleEventItem};
pub use money::{Money, TaxRate};
pub use pricing::{PricedLine, SaleTotals, TaxPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the seed binary and local development.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Stock location used when a caller does not name one.
pub const DEFAULT_LOCATION: &str = "main";

/// Flat order tax applied when no other policy is configured (7.00%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 700;

/// Largest quantity accepted on a single sale line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest number of lines accepted on a single sale.
pub const MAX_SALE_LINES: usize = 100;

/// Quantity at or below which a stock record counts as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;
