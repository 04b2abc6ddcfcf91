//! # meridian-events: Event Fan-Out for Meridian POS
//!
//! Decouples sale commit from everything that reacts to it.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleService::create_sale                                               │
//! │       │ COMMIT                                                          │
//! │       ▼                                                                 │
//! │  Dispatcher::publish(SaleCompletedEvent)  ── returns immediately        │
//! │       │                                                                 │
//! │       ├──► InventoryCompletionHandler    (Stock Ledger bulk_deduct)     │
//! │       └──► RecommendationPatternHandler  (purchase patterns)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dispatcher is an ordinary value: build one, subscribe handlers, and
//! pass clones to whoever publishes.
//!
//! ## Module Organization
//!
//! - [`dispatcher`] - `Dispatcher`, `DomainEvent`, `EventHandler`, `FanOut`
//! - [`handlers`] - handlers for `sale_completed`
//! - [`error`] - `HandlerError`

pub mod dispatcher;
pub mod error;
pub mod handlers;

pub use dispatcher::{
    DeliveryOutcome, DeliveryReport, Dispatcher, DomainEvent, Event, EventHandler, EventKind,
    FanOut, SubscriptionId,
};
pub use error::{HandlerError, HandlerResult};
pub use handlers::{
    subscribe_sale_handlers, InventoryCompletionHandler, RecommendationPatternHandler,
};
