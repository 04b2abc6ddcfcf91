//! # Repository Module
//!
//! Database repositories for Meridian POS.
//!
//! ## Pool vs. Connection Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  repo.get_by_id(id)                 runs on the pool                    │
//! │  ProductRepository::find_active_in(&mut tx, …)                          │
//! │                                     runs on the caller's transaction    │
//! │                                                                         │
//! │  The `_in` variants let SaleService keep every read and write of one    │
//! │  sale on a single connection, so a one-connection pool cannot deadlock  │
//! │  and all reads see the transaction's own writes.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog lookups
//! - [`CustomerRepository`](customer::CustomerRepository) - Loyalty accrual
//! - [`SaleRepository`](sale::SaleRepository) - Transactions and lines
//! - [`PatternRepository`](pattern::PatternRepository) - Purchase counters
//! - [`ReconciliationRepository`](reconciliation::ReconciliationRepository) - Stock flags

pub mod customer;
pub mod pattern;
pub mod product;
pub mod reconciliation;
pub mod sale;
