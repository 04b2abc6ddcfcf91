//! # Reconciliation Repository
//!
//! A completed sale whose stock could not be deducted is still a valid sale.
//! The inventory handler raises a flag here so an operator can fix the
//! stock count later; resolving a flag never touches stock.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{ReconciliationKind, StockReconciliationFlag};

#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    pool: SqlitePool,
}

impl ReconciliationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReconciliationRepository { pool }
    }

    pub async fn raise(
        &self,
        tenant_id: &str,
        transaction_id: &str,
        kind: ReconciliationKind,
        detail: impl Into<String>,
    ) -> DbResult<StockReconciliationFlag> {
        let flag = StockReconciliationFlag {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            transaction_id: transaction_id.to_string(),
            kind,
            detail: detail.into(),
            raised_at: Utc::now(),
            resolved_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_reconciliation_flags (
                id, tenant_id, transaction_id, kind, detail, raised_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
            "#,
        )
        .bind(&flag.id)
        .bind(&flag.tenant_id)
        .bind(&flag.transaction_id)
        .bind(flag.kind)
        .bind(&flag.detail)
        .bind(flag.raised_at)
        .execute(&self.pool)
        .await?;

        warn!(
            target: "meridian::reconciliation",
            flag_id = %flag.id,
            transaction_id,
            kind = ?kind,
            "Stock reconciliation flag raised"
        );
        Ok(flag)
    }

    /// Unresolved flags, oldest first.
    pub async fn open_flags(&self, tenant_id: &str) -> DbResult<Vec<StockReconciliationFlag>> {
        let flags = sqlx::query_as::<_, StockReconciliationFlag>(
            r#"
            SELECT id, tenant_id, transaction_id, kind, detail, raised_at, resolved_at
            FROM stock_reconciliation_flags
            WHERE tenant_id = ?1 AND resolved_at IS NULL
            ORDER BY raised_at, rowid
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(flags)
    }

    /// Marks an open flag resolved.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown id, or already resolved
    pub async fn resolve(&self, tenant_id: &str, flag_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_reconciliation_flags
            SET resolved_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND resolved_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(flag_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reconciliation flag", flag_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, TENANT};

    #[tokio::test]
    async fn test_raise_and_resolve() {
        let db = fixtures::memory_db().await;
        let repo = db.reconciliation();

        let flag = repo
            .raise(TENANT, "txn-1", ReconciliationKind::InsufficientStock, "cola: 0 < 2")
            .await
            .unwrap();
        repo.raise(TENANT, "txn-2", ReconciliationKind::RecordNotFound, "no record")
            .await
            .unwrap();

        let open = repo.open_flags(TENANT).await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0], flag);
        assert!(repo.open_flags("tenant-b").await.unwrap().is_empty());

        repo.resolve(TENANT, &flag.id).await.unwrap();
        let open = repo.open_flags(TENANT).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].transaction_id, "txn-2");

        assert!(matches!(
            repo.resolve(TENANT, &flag.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
