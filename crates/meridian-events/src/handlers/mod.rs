//! # Sale-Completed Handlers
//!
//! - [`InventoryCompletionHandler`] - stock deduction via the Stock Ledger
//! - [`RecommendationPatternHandler`] - purchase and co-purchase counters
//!
//! Both read only the event payload; neither touches the sale tables.

pub mod inventory;
pub mod recommendation;

pub use inventory::InventoryCompletionHandler;
pub use recommendation::RecommendationPatternHandler;

use meridian_core::SaleCompletedEvent;
use meridian_db::Database;
use std::sync::Arc;

use crate::dispatcher::{Dispatcher, SubscriptionId};

/// Subscribes both handlers, deducting stock at `location_id`.
pub fn subscribe_sale_handlers(
    dispatcher: &Dispatcher,
    db: &Database,
    location_id: &str,
) -> Vec<SubscriptionId> {
    vec![
        dispatcher.subscribe::<SaleCompletedEvent>(Arc::new(
            InventoryCompletionHandler::new(db.clone()).with_location(location_id),
        )),
        dispatcher.subscribe::<SaleCompletedEvent>(Arc::new(RecommendationPatternHandler::new(
            db.clone(),
        ))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DeliveryOutcome;
    use chrono::Utc;
    use meridian_core::{Money, SaleEventItem, DEFAULT_LOCATION};
    use meridian_db::fixtures::{self, TENANT};

    fn event(id: &str) -> SaleCompletedEvent {
        SaleCompletedEvent {
            transaction_id: id.to_string(),
            tenant_id: TENANT.to_string(),
            items: vec![
                SaleEventItem {
                    product_id: "a".to_string(),
                    quantity: 2,
                    price: Money::from_cents(100),
                },
                SaleEventItem {
                    product_id: "b".to_string(),
                    quantity: 1,
                    price: Money::from_cents(50),
                },
            ],
            total_amount: Money::from_cents(250),
            customer_id: None,
            timestamp: Utc::now(),
        }
    }

    fn outcome_of<'a>(
        reports: &'a [crate::dispatcher::DeliveryReport],
        handler: &str,
    ) -> &'a DeliveryOutcome {
        &reports
            .iter()
            .find(|r| r.handler == handler)
            .expect("report for handler")
            .outcome
    }

    #[tokio::test]
    async fn test_inventory_failure_does_not_block_recommendations() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 1).await;
        fixtures::seed_product(&db, "b", "B", 50, 5).await;

        let dispatcher = Dispatcher::new();
        subscribe_sale_handlers(&dispatcher, &db, DEFAULT_LOCATION);

        let reports = dispatcher.publish(event("txn-1")).wait().await;

        assert!(matches!(outcome_of(&reports, "inventory"), DeliveryOutcome::Failed(_)));
        assert_eq!(outcome_of(&reports, "recommendations"), &DeliveryOutcome::Delivered);
        assert_eq!(
            db.patterns().co_purchase_count(TENANT, "a", "b").await.unwrap(),
            1
        );
        assert_eq!(db.reconciliation().open_flags(TENANT).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recommendation_failure_does_not_block_inventory() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 10).await;
        fixtures::seed_product(&db, "b", "B", 50, 5).await;
        sqlx::query("DROP TABLE purchase_patterns")
            .execute(db.pool())
            .await
            .unwrap();

        let dispatcher = Dispatcher::new();
        subscribe_sale_handlers(&dispatcher, &db, DEFAULT_LOCATION);

        let reports = dispatcher.publish(event("txn-1")).wait().await;

        assert_eq!(outcome_of(&reports, "inventory"), &DeliveryOutcome::Delivered);
        assert!(matches!(
            outcome_of(&reports, "recommendations"),
            DeliveryOutcome::Failed(_)
        ));
        assert_eq!(
            db.ledger().available_quantity("a", TENANT, None).await.unwrap(),
            8
        );
        // The failed pattern transaction left no pair behind.
        assert_eq!(
            db.patterns().co_purchase_count(TENANT, "a", "b").await.unwrap(),
            0
        );
    }
}
