//! # Recommendation Pattern Handler
//!
//! Feeds completed sales into the purchase and co-purchase counters.
//! A failure rolls back this handler's own updates only.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use meridian_core::SaleCompletedEvent;
use meridian_db::Database;
use std::sync::Arc;
use tracing::{debug, error};

use crate::dispatcher::EventHandler;
use crate::error::HandlerResult;

pub struct RecommendationPatternHandler {
    db: Database,
}

impl RecommendationPatternHandler {
    pub fn new(db: Database) -> Self {
        RecommendationPatternHandler { db }
    }

    async fn process(&self, event: &SaleCompletedEvent) -> HandlerResult {
        if let Err(err) = self.db.patterns().record_sale(event).await {
            error!(
                transaction_id = %event.transaction_id,
                error = %err,
                "Failed to record purchase patterns"
            );
            return Err(err.into());
        }

        debug!(
            transaction_id = %event.transaction_id,
            units = event.unit_count(),
            "Purchase patterns updated"
        );
        Ok(())
    }
}

impl EventHandler<SaleCompletedEvent> for RecommendationPatternHandler {
    fn name(&self) -> &str {
        "recommendations"
    }

    fn handle(&self, event: Arc<SaleCompletedEvent>) -> BoxFuture<'_, HandlerResult> {
        async move { self.process(&event).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{Money, SaleEventItem};
    use meridian_db::fixtures::{self, TENANT};

    #[tokio::test]
    async fn test_records_patterns() {
        let db = fixtures::memory_db().await;
        let handler = RecommendationPatternHandler::new(db.clone());

        let event = Arc::new(SaleCompletedEvent {
            transaction_id: "txn-1".to_string(),
            tenant_id: TENANT.to_string(),
            items: vec![
                SaleEventItem {
                    product_id: "bread".to_string(),
                    quantity: 2,
                    price: Money::from_cents(300),
                },
                SaleEventItem {
                    product_id: "butter".to_string(),
                    quantity: 1,
                    price: Money::from_cents(450),
                },
            ],
            total_amount: Money::from_cents(1_050),
            customer_id: None,
            timestamp: Utc::now(),
        });

        handler.handle(event.clone()).await.unwrap();
        handler.handle(event).await.unwrap();

        let patterns = db.patterns();
        let bread = patterns.purchase_pattern(TENANT, "bread").await.unwrap().unwrap();
        assert_eq!(bread.purchase_count, 4);
        assert_eq!(
            patterns.co_purchase_count(TENANT, "butter", "bread").await.unwrap(),
            2
        );
    }
}
