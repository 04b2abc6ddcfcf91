//! # Purchase Pattern Repository
//!
//! Counters behind recommendations, written by the recommendation handler.
//!
//! ```text
//! SaleCompleted { items: [cola×2, chips×1, salsa×1] }
//!
//! purchase_patterns            co_purchase_patterns (product_a < product_b)
//! ─────────────────            ───────────────────────────────────────────
//! cola   += 2                  (chips, cola)   += 1
//! chips  += 1                  (chips, salsa)  += 1
//! salsa  += 1                  (cola,  salsa)  += 1
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{CoPurchasePattern, PurchasePattern, SaleCompletedEvent};

#[derive(Debug, Clone)]
pub struct PatternRepository {
    pool: SqlitePool,
}

impl PatternRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PatternRepository { pool }
    }

    /// Applies one completed sale to both counter tables in a single
    /// transaction.
    ///
    /// Purchase counts grow by units sold. Each distinct product pair grows
    /// by one, however many units of each were bought.
    pub async fn record_sale(&self, event: &SaleCompletedEvent) -> DbResult<()> {
        let pairs = event.co_purchase_pairs();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        for item in &event.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_patterns (product_id, tenant_id, purchase_count, last_purchased_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (product_id, tenant_id) DO UPDATE SET
                    purchase_count = purchase_count + excluded.purchase_count,
                    last_purchased_at = excluded.last_purchased_at
                "#,
            )
            .bind(&item.product_id)
            .bind(&event.tenant_id)
            .bind(item.quantity)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        for (product_a, product_b) in &pairs {
            sqlx::query(
                r#"
                INSERT INTO co_purchase_patterns (tenant_id, product_a, product_b, co_purchase_count, updated_at)
                VALUES (?1, ?2, ?3, 1, ?4)
                ON CONFLICT (tenant_id, product_a, product_b) DO UPDATE SET
                    co_purchase_count = co_purchase_count + 1,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&event.tenant_id)
            .bind(product_a)
            .bind(product_b)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            transaction_id = %event.transaction_id,
            products = event.items.len(),
            pairs = pairs.len(),
            "Purchase patterns recorded"
        );
        Ok(())
    }

    pub async fn purchase_pattern(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> DbResult<Option<PurchasePattern>> {
        let pattern = sqlx::query_as::<_, PurchasePattern>(
            r#"
            SELECT product_id, tenant_id, purchase_count, last_purchased_at
            FROM purchase_patterns
            WHERE product_id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pattern)
    }

    /// How often two products were bought together. Order of arguments does
    /// not matter; a product paired with itself is always zero.
    pub async fn co_purchase_count(&self, tenant_id: &str, x: &str, y: &str) -> DbResult<i64> {
        if x == y {
            return Ok(0);
        }
        let (product_a, product_b) = CoPurchasePattern::key(x, y);

        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT co_purchase_count FROM co_purchase_patterns
            WHERE tenant_id = ?1 AND product_a = ?2 AND product_b = ?3
            "#,
        )
        .bind(tenant_id)
        .bind(product_a)
        .bind(product_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }

    /// Pairs containing `product_id`, strongest first. Use
    /// [`CoPurchasePattern::partner_of`] to get the other product.
    pub async fn frequently_bought_together(
        &self,
        tenant_id: &str,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<CoPurchasePattern>> {
        let patterns = sqlx::query_as::<_, CoPurchasePattern>(
            r#"
            SELECT tenant_id, product_a, product_b, co_purchase_count, updated_at
            FROM co_purchase_patterns
            WHERE tenant_id = ?1 AND (product_a = ?2 OR product_b = ?2)
            ORDER BY co_purchase_count DESC, product_a, product_b
            LIMIT ?3
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(patterns)
    }

    /// Best sellers among products bought at or after `since`.
    pub async fn trending(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<PurchasePattern>> {
        let patterns = sqlx::query_as::<_, PurchasePattern>(
            r#"
            SELECT product_id, tenant_id, purchase_count, last_purchased_at
            FROM purchase_patterns
            WHERE tenant_id = ?1 AND last_purchased_at >= ?2
            ORDER BY purchase_count DESC, product_id
            LIMIT ?3
            "#,
        )
        .bind(tenant_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, TENANT};
    use chrono::Duration;
    use meridian_core::{Money, SaleEventItem};

    fn event(id: &str, items: &[(&str, i64)]) -> SaleCompletedEvent {
        SaleCompletedEvent {
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
        }
    }

    #[tokio::test]
    async fn test_record_sale_counts_units_and_pairs() {
        let db = fixtures::memory_db().await;
        let patterns = db.patterns();

        patterns
            .record_sale(&event("t1", &[("cola", 2), ("chips", 1), ("salsa", 1)]))
            .await
            .unwrap();
        patterns
            .record_sale(&event("t2", &[("cola", 1), ("chips", 3)]))
            .await
            .unwrap();

        let cola = patterns.purchase_pattern(TENANT, "cola").await.unwrap().unwrap();
        assert_eq!(cola.purchase_count, 3);
        let chips = patterns.purchase_pattern(TENANT, "chips").await.unwrap().unwrap();
        assert_eq!(chips.purchase_count, 4);

        assert_eq!(patterns.co_purchase_count(TENANT, "cola", "chips").await.unwrap(), 2);
        assert_eq!(patterns.co_purchase_count(TENANT, "chips", "cola").await.unwrap(), 2);
        assert_eq!(patterns.co_purchase_count(TENANT, "cola", "salsa").await.unwrap(), 1);
        assert_eq!(patterns.co_purchase_count(TENANT, "cola", "cola").await.unwrap(), 0);
        assert_eq!(patterns.co_purchase_count("tenant-b", "cola", "chips").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_item_sale_has_no_pairs() {
        let db = fixtures::memory_db().await;
        db.patterns().record_sale(&event("t1", &[("cola", 5)])).await.unwrap();

        assert!(db
            .patterns()
            .frequently_bought_together(TENANT, "cola", 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_frequently_bought_together_and_trending() {
        let db = fixtures::memory_db().await;
        let patterns = db.patterns();
        patterns.record_sale(&event("t1", &[("cola", 1), ("chips", 1)])).await.unwrap();
        patterns.record_sale(&event("t2", &[("cola", 1), ("chips", 1)])).await.unwrap();
        patterns.record_sale(&event("t3", &[("cola", 4), ("gum", 1)])).await.unwrap();

        let together = patterns
            .frequently_bought_together(TENANT, "cola", 10)
            .await
            .unwrap();
        let partners: Vec<&str> = together.iter().map(|p| p.partner_of("cola")).collect();
        assert_eq!(partners, vec!["chips", "gum"]);

        let trending = patterns
            .trending(TENANT, Utc::now() - Duration::hours(1), 2)
            .await
            .unwrap();
        let ids: Vec<&str> = trending.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["cola", "chips"]);

        let future = patterns
            .trending(TENANT, Utc::now() + Duration::hours(1), 10)
            .await
            .unwrap();
        assert!(future.is_empty());
    }
}
