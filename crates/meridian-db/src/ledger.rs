//! # Stock Ledger
//!
//! The only writer of `stock_records` and `stock_movements`.
//!
//! ## Deduction Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  bulk_deduct([A×2, B×1])                                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── A: UPDATE … SET quantity = quantity … RETURNING quantity  (lock)  │
//! │   │      old = 5, new = 3  → UPDATE quantity, INSERT movement           │
//! │   ├── B: UPDATE … RETURNING quantity                                    │
//! │   │      old = 0, new = -1 → InsufficientStock → ROLLBACK (A undone)    │
//! │   └── all ok → COMMIT                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has no `SELECT … FOR UPDATE`. The first statement that touches a
//! row is a no-op `UPDATE … RETURNING`, which takes the database write lock
//! and returns the quantity as seen under that lock. A concurrent deduction
//! waits (busy timeout) until this transaction commits or rolls back, then
//! reads the already-decremented quantity.
//!
//! Every mutation appends exactly one movement with
//! `old_quantity + quantity_change == new_quantity`, in the same transaction
//! as the record update.

use chrono::Utc;
use meridian_core::validation::validate_stock_level;
use meridian_core::{
    MovementReason, StockMovement, StockRecord, ValidationError, DEFAULT_LOCATION,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbResult, StockError, StockResult};

/// One requested deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: String,
    pub tenant_id: String,
    pub location_id: String,
    /// Units to remove; must be positive.
    pub quantity: i64,
    pub reason: MovementReason,
    /// Stored on the movement, e.g. the sale's transaction id.
    pub reference_id: Option<String>,
}

impl StockUpdate {
    /// A sale deduction at the default location.
    pub fn sale(product_id: impl Into<String>, tenant_id: impl Into<String>, quantity: i64) -> Self {
        StockUpdate {
            product_id: product_id.into(),
            tenant_id: tenant_id.into(),
            location_id: DEFAULT_LOCATION.to_string(),
            quantity,
            reason: MovementReason::Sale,
            reference_id: None,
        }
    }

    pub fn at_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = location_id.into();
        self
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }
}

/// Stock Ledger handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    // =========================================================================
    // Reads (no locking)
    // =========================================================================

    /// Whether `quantity` units are on hand. A missing record counts as zero.
    pub async fn check_availability(
        &self,
        product_id: &str,
        tenant_id: &str,
        quantity: i64,
        location_id: Option<&str>,
    ) -> StockResult<bool> {
        let available = self
            .available_quantity(product_id, tenant_id, location_id)
            .await?;
        Ok(available >= quantity)
    }

    pub async fn available_quantity(
        &self,
        product_id: &str,
        tenant_id: &str,
        location_id: Option<&str>,
    ) -> StockResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::available_quantity_in(&mut conn, product_id, tenant_id, location_id).await?)
    }

    /// Same read on a caller's connection, so it can run inside the
    /// caller's transaction.
    pub async fn available_quantity_in(
        conn: &mut SqliteConnection,
        product_id: &str,
        tenant_id: &str,
        location_id: Option<&str>,
    ) -> DbResult<i64> {
        let quantity: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity FROM stock_records
            WHERE product_id = ?1 AND tenant_id = ?2 AND location_id = ?3
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(location_id.unwrap_or(DEFAULT_LOCATION))
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quantity.unwrap_or(0))
    }

    pub async fn get_record(
        &self,
        product_id: &str,
        tenant_id: &str,
        location_id: Option<&str>,
    ) -> StockResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT product_id, tenant_id, location_id, quantity, updated_at
            FROM stock_records
            WHERE product_id = ?1 AND tenant_id = ?2 AND location_id = ?3
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(location_id.unwrap_or(DEFAULT_LOCATION))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Movement history for a product, oldest first.
    pub async fn movements(&self, product_id: &str, tenant_id: &str) -> StockResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, tenant_id, location_id, quantity_change, reason,
                   old_quantity, new_quantity, reference_id, created_at
            FROM stock_movements
            WHERE product_id = ?1 AND tenant_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Records at or below `threshold`, emptiest first.
    pub async fn low_stock(&self, tenant_id: &str, threshold: i64) -> StockResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT product_id, tenant_id, location_id, quantity, updated_at
            FROM stock_records
            WHERE tenant_id = ?1 AND quantity <= ?2
            ORDER BY quantity ASC, product_id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    // =========================================================================
    // Deductions
    // =========================================================================

    /// Deducts a single item atomically.
    pub async fn deduct(&self, update: &StockUpdate) -> StockResult<StockMovement> {
        validate_quantity(update.quantity)?;

        let mut tx = self.pool.begin().await?;
        let movement = Self::deduct_in(&mut tx, update).await?;
        tx.commit().await?;

        debug!(
            product_id = %update.product_id,
            new = movement.new_quantity,
            "Stock deducted"
        );
        Ok(movement)
    }

    /// Deducts every item or none.
    ///
    /// ## Errors
    /// - `InsufficientStock` if any item would go below zero
    /// - `RecordNotFound` if any item has no stock record at its location
    /// - `Invalid` for a non-positive quantity (checked before BEGIN)
    ///
    /// Any error rolls back the whole batch.
    pub async fn bulk_deduct(&self, updates: &[StockUpdate]) -> StockResult<Vec<StockMovement>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        for update in updates {
            validate_quantity(update.quantity)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut movements = Vec::with_capacity(updates.len());

        for update in updates {
            // Returning early drops `tx`, which rolls back.
            let movement = Self::deduct_in(&mut tx, update).await?;
            movements.push(movement);
        }

        tx.commit().await?;

        info!(
            items = movements.len(),
            tenant_id = %updates[0].tenant_id,
            "Stock deduction committed"
        );
        Ok(movements)
    }

    async fn deduct_in(conn: &mut SqliteConnection, update: &StockUpdate) -> StockResult<StockMovement> {
        let old = Self::lock_quantity(
            conn,
            &update.product_id,
            &update.tenant_id,
            &update.location_id,
        )
        .await?
        .ok_or_else(|| StockError::RecordNotFound {
            product_id: update.product_id.clone(),
            location_id: update.location_id.clone(),
        })?;

        let new = old - update.quantity;
        if new < 0 {
            warn!(
                product_id = %update.product_id,
                available = old,
                requested = update.quantity,
                "Insufficient stock, rolling back deduction"
            );
            return Err(StockError::InsufficientStock {
                product_id: update.product_id.clone(),
                available: old,
                requested: update.quantity,
            });
        }

        let movement = Self::write_change(
            conn,
            &update.product_id,
            &update.tenant_id,
            &update.location_id,
            old,
            new,
            update.reason,
            update.reference_id.as_deref(),
        )
        .await?;

        Ok(movement)
    }

    // =========================================================================
    // Adjustments
    // =========================================================================

    /// Applies a signed delta. A missing record starts at zero.
    ///
    /// Positive deltas are recorded as `restock`, negative ones as
    /// `adjustment`. The result may not go below zero.
    pub async fn adjust(
        &self,
        product_id: &str,
        tenant_id: &str,
        location_id: &str,
        delta: i64,
    ) -> StockResult<StockMovement> {
        if delta == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "delta".to_string(),
                reason: "must not be zero".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        let old = Self::lock_or_create(&mut tx, product_id, tenant_id, location_id).await?;

        let new = old + delta;
        if new < 0 {
            return Err(StockError::InsufficientStock {
                product_id: product_id.to_string(),
                available: old,
                requested: -delta,
            });
        }

        let reason = if delta > 0 {
            MovementReason::Restock
        } else {
            MovementReason::Adjustment
        };
        let movement =
            Self::write_change(&mut tx, product_id, tenant_id, location_id, old, new, reason, None)
                .await?;
        tx.commit().await?;

        debug!(product_id, location_id, old, new, "Stock adjusted");
        Ok(movement)
    }

    /// Overwrites the on-hand quantity (initial stocking, stock takes).
    pub async fn set_absolute(
        &self,
        product_id: &str,
        tenant_id: &str,
        location_id: &str,
        quantity: i64,
    ) -> StockResult<StockMovement> {
        validate_stock_level(quantity)?;

        let mut tx = self.pool.begin().await?;
        let old = Self::lock_or_create(&mut tx, product_id, tenant_id, location_id).await?;
        let movement = Self::write_change(
            &mut tx,
            product_id,
            tenant_id,
            location_id,
            old,
            quantity,
            MovementReason::Adjustment,
            None,
        )
        .await?;
        tx.commit().await?;

        debug!(product_id, location_id, old, new = quantity, "Stock level set");
        Ok(movement)
    }

    // =========================================================================
    // Row-level primitives
    // =========================================================================

    /// Takes the write lock on a stock row and returns its quantity.
    async fn lock_quantity(
        conn: &mut SqliteConnection,
        product_id: &str,
        tenant_id: &str,
        location_id: &str,
    ) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock_records
            SET quantity = quantity
            WHERE product_id = ?1 AND tenant_id = ?2 AND location_id = ?3
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quantity)
    }

    async fn lock_or_create(
        conn: &mut SqliteConnection,
        product_id: &str,
        tenant_id: &str,
        location_id: &str,
    ) -> StockResult<i64> {
        sqlx::query(
            r#"
            INSERT INTO stock_records (product_id, tenant_id, location_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            ON CONFLICT (product_id, tenant_id, location_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(location_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Self::lock_quantity(conn, product_id, tenant_id, location_id)
            .await?
            .ok_or_else(|| StockError::RecordNotFound {
                product_id: product_id.to_string(),
                location_id: location_id.to_string(),
            })
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_change(
        conn: &mut SqliteConnection,
        product_id: &str,
        tenant_id: &str,
        location_id: &str,
        old_quantity: i64,
        new_quantity: i64,
        reason: MovementReason,
        reference_id: Option<&str>,
    ) -> DbResult<StockMovement> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE stock_records
            SET quantity = ?1, updated_at = ?2
            WHERE product_id = ?3 AND tenant_id = ?4 AND location_id = ?5
            "#,
        )
        .bind(new_quantity)
        .bind(now)
        .bind(product_id)
        .bind(tenant_id)
        .bind(location_id)
        .execute(&mut *conn)
        .await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            tenant_id: tenant_id.to_string(),
            location_id: location_id.to_string(),
            quantity_change: new_quantity - old_quantity,
            reason,
            old_quantity,
            new_quantity,
            reference_id: reference_id.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, tenant_id, location_id, quantity_change,
                reason, old_quantity, new_quantity, reference_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.tenant_id)
        .bind(&movement.location_id)
        .bind(movement.quantity_change)
        .bind(movement.reason)
        .bind(movement.old_quantity)
        .bind(movement.new_quantity)
        .bind(&movement.reference_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(movement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

fn validate_quantity(quantity: i64) -> StockResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, TENANT};
    use crate::{Database, DbConfig};
    use std::sync::Arc;

    async fn quantity(db: &Database, product_id: &str) -> i64 {
        db.ledger()
            .available_quantity(product_id, TENANT, None)
            .await
            .unwrap()
    }

    async fn assert_all_movements_consistent(db: &Database) {
        let all = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, tenant_id, location_id, quantity_change, reason, \
             old_quantity, new_quantity, reference_id, created_at FROM stock_movements",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert!(!all.is_empty());
        assert!(all.iter().all(StockMovement::is_consistent));
    }

    #[tokio::test]
    async fn test_deduct_records_movement() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "cola", "Cola", 250, 10).await;

        let update = StockUpdate::sale("cola", TENANT, 3).with_reference("txn-1");
        let movement = db.ledger().deduct(&update).await.unwrap();

        assert_eq!(movement.old_quantity, 10);
        assert_eq!(movement.new_quantity, 7);
        assert_eq!(movement.quantity_change, -3);
        assert_eq!(movement.reason, MovementReason::Sale);
        assert_eq!(movement.reference_id.as_deref(), Some("txn-1"));
        assert_eq!(quantity(&db, "cola").await, 7);

        let history = db.ledger().movements("cola", TENANT).await.unwrap();
        assert_eq!(history.len(), 2); // initial stocking + sale
        assert_eq!(history[1], movement);
        assert_all_movements_consistent(&db).await;
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_no_trace() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "cola", "Cola", 250, 2).await;

        let err = db
            .ledger()
            .deduct(&StockUpdate::sale("cola", TENANT, 3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StockError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(quantity(&db, "cola").await, 2);
        assert_eq!(db.ledger().movements("cola", TENANT).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_distinguishable() {
        let db = fixtures::memory_db().await;
        fixtures::insert_product(&db, "ghost", "Ghost", 100, true).await;

        let err = db
            .ledger()
            .deduct(&StockUpdate::sale("ghost", TENANT, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::RecordNotFound { .. }));

        let err = db
            .ledger()
            .deduct(&StockUpdate::sale("ghost", TENANT, 1).at_location("backroom"))
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::RecordNotFound { ref location_id, .. } if location_id == "backroom"));
    }

    #[tokio::test]
    async fn test_bulk_deduct_is_all_or_nothing() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "bread", "Bread", 300, 5).await;
        fixtures::seed_product(&db, "milk", "Milk", 150, 1).await;

        let updates = vec![
            StockUpdate::sale("bread", TENANT, 2),
            StockUpdate::sale("milk", TENANT, 2),
        ];
        let err = db.ledger().bulk_deduct(&updates).await.unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { ref product_id, .. } if product_id == "milk"));

        assert_eq!(quantity(&db, "bread").await, 5);
        assert_eq!(quantity(&db, "milk").await, 1);
        assert_eq!(db.ledger().movements("bread", TENANT).await.unwrap().len(), 1);

        let ok = vec![
            StockUpdate::sale("bread", TENANT, 2),
            StockUpdate::sale("milk", TENANT, 1),
        ];
        let movements = db.ledger().bulk_deduct(&ok).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(quantity(&db, "bread").await, 3);
        assert_eq!(quantity(&db, "milk").await, 0);
    }

    #[tokio::test]
    async fn test_bulk_deduct_same_product_twice_sees_own_writes() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "gum", "Gum", 99, 3).await;

        let updates = vec![
            StockUpdate::sale("gum", TENANT, 2),
            StockUpdate::sale("gum", TENANT, 2),
        ];
        assert!(db.ledger().bulk_deduct(&updates).await.is_err());
        assert_eq!(quantity(&db, "gum").await, 3);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_quantity() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "gum", "Gum", 99, 3).await;

        for bad in [0, -2] {
            let err = db
                .ledger()
                .deduct(&StockUpdate::sale("gum", TENANT, bad))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                StockError::Invalid(ValidationError::MustBePositive { ref field }) if field == "quantity"
            ));
        }
        assert_eq!(quantity(&db, "gum").await, 3);
        assert!(db.ledger().bulk_deduct(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_bulk_deduct_single_connection() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "last-one", "Last One", 500, 5).await;

        let ledger = db.ledger();
        let first = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .bulk_deduct(&[StockUpdate::sale("last-one", TENANT, 3)])
                    .await
            })
        };
        let second = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .bulk_deduct(&[StockUpdate::sale("last-one", TENANT, 3)])
                    .await
            })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|r| matches!(r, Err(StockError::InsufficientStock { .. })))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(quantity(&db, "last-one").await, 2);
        assert_all_movements_consistent(&db).await;
    }

    /// Real parallel writers on separate connections to one file.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deductions_never_oversell() {
        let path = std::env::temp_dir().join(format!("meridian-ledger-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        fixtures::seed_product(&db, "hot-item", "Hot Item", 1000, 5).await;

        let ledger = Arc::new(db.ledger());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .bulk_deduct(&[StockUpdate::sale("hot-item", TENANT, 1)])
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StockError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(quantity(&db, "hot-item").await, 0);
        assert_eq!(db.ledger().movements("hot-item", TENANT).await.unwrap().len(), 6);
        assert_all_movements_consistent(&db).await;

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_adjust() {
        let db = fixtures::memory_db().await;
        fixtures::insert_product(&db, "soap", "Soap", 400, true).await;
        let ledger = db.ledger();

        let restock = ledger.adjust("soap", TENANT, "main", 12).await.unwrap();
        assert_eq!(restock.reason, MovementReason::Restock);
        assert_eq!((restock.old_quantity, restock.new_quantity), (0, 12));

        let shrink = ledger.adjust("soap", TENANT, "main", -2).await.unwrap();
        assert_eq!(shrink.reason, MovementReason::Adjustment);
        assert_eq!(shrink.new_quantity, 10);

        let err = ledger.adjust("soap", TENANT, "main", -11).await.unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { available: 10, requested: 11, .. }));
        assert!(matches!(
            ledger.adjust("soap", TENANT, "main", 0).await,
            Err(StockError::Invalid(_))
        ));
        assert_eq!(quantity(&db, "soap").await, 10);
    }

    #[tokio::test]
    async fn test_set_absolute() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "tea", "Tea", 350, 4).await;
        let ledger = db.ledger();

        let movement = ledger.set_absolute("tea", TENANT, "main", 9).await.unwrap();
        assert_eq!(movement.quantity_change, 5);
        assert_eq!(movement.reason, MovementReason::Adjustment);

        assert!(matches!(
            ledger.set_absolute("tea", TENANT, "main", -1).await,
            Err(StockError::Invalid(_))
        ));

        ledger.set_absolute("tea", TENANT, "backroom", 2).await.unwrap();
        assert_eq!(
            ledger.available_quantity("tea", TENANT, Some("backroom")).await.unwrap(),
            2
        );
        assert_eq!(quantity(&db, "tea").await, 9);
        assert_all_movements_consistent(&db).await;
    }

    #[tokio::test]
    async fn test_check_availability_and_low_stock() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 3).await;
        fixtures::seed_product(&db, "b", "B", 100, 50).await;
        fixtures::insert_product(&db, "c", "C", 100, true).await;
        let ledger = db.ledger();

        assert!(ledger.check_availability("a", TENANT, 3, None).await.unwrap());
        assert!(!ledger.check_availability("a", TENANT, 4, None).await.unwrap());
        assert!(!ledger.check_availability("c", TENANT, 1, None).await.unwrap());

        let low = ledger.low_stock(TENANT, 10).await.unwrap();
        let ids: Vec<&str> = low.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_movements_are_append_only() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 100, 3).await;

        let update = sqlx::query("UPDATE stock_movements SET new_quantity = 99")
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM stock_movements").execute(db.pool()).await;
        assert!(delete.is_err());
    }
}
