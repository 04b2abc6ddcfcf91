//! # Inventory Completion Handler
//!
//! Deducts stock for a completed sale through the Stock Ledger.
//!
//! ```text
//! SaleCompleted ──► bulk_deduct([item × N], reason = sale, ref = txn id)
//!                       │
//!                       ├── Ok   → info!, Delivered
//!                       └── Err  → error!, raise StockReconciliationFlag,
//!                                  Failed (no retry; the sale stands)
//! ```

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use meridian_core::{SaleCompletedEvent, DEFAULT_LOCATION};
use meridian_db::{Database, StockUpdate};
use std::sync::Arc;
use tracing::{error, info};

use crate::dispatcher::EventHandler;
use crate::error::HandlerResult;

pub struct InventoryCompletionHandler {
    db: Database,
    location_id: String,
}

impl InventoryCompletionHandler {
    pub fn new(db: Database) -> Self {
        InventoryCompletionHandler {
            db,
            location_id: DEFAULT_LOCATION.to_string(),
        }
    }

    /// Deduct from a location other than `main`.
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = location_id.into();
        self
    }

    pub fn stock_updates(&self, event: &SaleCompletedEvent) -> Vec<StockUpdate> {
        event
            .items
            .iter()
            .map(|item| {
                StockUpdate::sale(&item.product_id, &event.tenant_id, item.quantity)
                    .at_location(&self.location_id)
                    .with_reference(&event.transaction_id)
            })
            .collect()
    }

    async fn process(&self, event: &SaleCompletedEvent) -> HandlerResult {
        let updates = self.stock_updates(event);

        match self.db.ledger().bulk_deduct(&updates).await {
            Ok(movements) => {
                info!(
                    transaction_id = %event.transaction_id,
                    movements = movements.len(),
                    "Stock deducted for completed sale"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    transaction_id = %event.transaction_id,
                    tenant_id = %event.tenant_id,
                    error = %err,
                    "Stock deduction failed for completed sale"
                );

                if let Err(flag_err) = self
                    .db
                    .reconciliation()
                    .raise(
                        &event.tenant_id,
                        &event.transaction_id,
                        err.reconciliation_kind(),
                        err.to_string(),
                    )
                    .await
                {
                    error!(
                        transaction_id = %event.transaction_id,
                        error = %flag_err,
                        "Could not raise stock reconciliation flag"
                    );
                }

                Err(err.into())
            }
        }
    }
}

impl EventHandler<SaleCompletedEvent> for InventoryCompletionHandler {
    fn name(&self) -> &str {
        "inventory"
    }

    fn handle(&self, event: Arc<SaleCompletedEvent>) -> BoxFuture<'_, HandlerResult> {
        async move { self.process(&event).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use chrono::Utc;
    use meridian_core::{Money, MovementReason, ReconciliationKind, SaleEventItem};
    use meridian_db::fixtures::{self, TENANT};
    use crate::dispatcher::{DeliveryOutcome, Dispatcher};
    use meridian_db::StockError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts ERROR-level events.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn event(id: &str, items: &[(&str, i64)]) -> Arc<SaleCompletedEvent> {
        Arc::new(SaleCompletedEvent {
            transaction_id: id.to_string(),
            tenant_id: TENANT.to_string(),
            items: items
                .iter()
                .map(|(product_id, quantity)| SaleEventItem {
                    product_id: product_id.to_string(),
                    quantity: *quantity,
                    price: Money::from_cents(100),
                })
                .collect(),
            total_amount: Money::from_cents(100),
            customer_id: None,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_deducts_stock_with_sale_reference() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 10).await;
        fixtures::seed_product(&db, "b", "B", 50, 5).await;

        let handler = InventoryCompletionHandler::new(db.clone());
        handler
            .handle(event("txn-1", &[("a", 2), ("b", 1)]))
            .await
            .unwrap();

        let ledger = db.ledger();
        assert_eq!(ledger.available_quantity("a", TENANT, None).await.unwrap(), 8);
        assert_eq!(ledger.available_quantity("b", TENANT, None).await.unwrap(), 4);

        let movements = ledger.movements("a", TENANT).await.unwrap();
        let sale = movements.last().unwrap();
        assert_eq!(sale.reason, MovementReason::Sale);
        assert_eq!(sale.reference_id.as_deref(), Some("txn-1"));
        assert!(db.reconciliation().open_flags(TENANT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_raises_reconciliation_flag() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 10).await;
        fixtures::seed_product(&db, "b", "B", 50, 0).await;

        let handler = InventoryCompletionHandler::new(db.clone());
        let err = handler
            .handle(event("txn-9", &[("a", 2), ("b", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Stock(StockError::InsufficientStock { .. })
        ));

        // Nothing deducted, not even the item that had stock.
        assert_eq!(
            db.ledger().available_quantity("a", TENANT, None).await.unwrap(),
            10
        );

        let flags = db.reconciliation().open_flags(TENANT).await.unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].transaction_id, "txn-9");
        assert_eq!(flags[0].kind, ReconciliationKind::InsufficientStock);
    }

    #[tokio::test]
    async fn test_missing_record_flag_kind() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 10).await;

        let handler = InventoryCompletionHandler::new(db.clone()).with_location("kiosk");
        assert!(handler.handle(event("txn-2", &[("a", 1)])).await.is_err());

        let flags = db.reconciliation().open_flags(TENANT).await.unwrap();
        assert_eq!(flags[0].kind, ReconciliationKind::RecordNotFound);
    }

    #[tokio::test]
    async fn test_dispatched_failure_logs_one_error() {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(errors.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 1).await;

        let dispatcher = Dispatcher::new();
        dispatcher.subscribe::<SaleCompletedEvent>(Arc::new(InventoryCompletionHandler::new(
            db.clone(),
        )));
        let reports = dispatcher
            .publish((*event("txn-3", &[("a", 5)])).clone())
            .wait()
            .await;

        assert!(matches!(reports[0].outcome, DeliveryOutcome::Failed(_)));
        assert_eq!(db.reconciliation().open_flags(TENANT).await.unwrap().len(), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
