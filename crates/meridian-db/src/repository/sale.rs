//! # Sale Repository
//!
//! Completed sales and their lines.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleService::create_sale (one transaction)                             │
//! │                                                                         │
//! │  1. next_transaction_number_in   → TXN-20260301-000042                  │
//! │  2. insert_transaction_in        → sale_transactions row                │
//! │  3. insert_line_in × N           → sale_line_items rows                 │
//! │  4. CustomerRepository::accrue_loyalty_in (optional)                    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The write methods take the caller's connection; reads use the pool.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use meridian_core::pricing::format_transaction_number;
use meridian_core::{SaleLineItem, SaleTransaction};

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Allocates the tenant's next transaction number.
    ///
    /// The counter row is bumped inside the caller's transaction, so a
    /// rolled-back sale gives its number back.
    pub async fn next_transaction_number_in(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<String> {
        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transaction_counters (tenant_id, last_value)
            VALUES (?1, 1)
            ON CONFLICT (tenant_id) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(format_transaction_number(at, sequence))
    }

    pub async fn insert_transaction_in(
        conn: &mut SqliteConnection,
        transaction: &SaleTransaction,
    ) -> DbResult<()> {
        debug!(
            id = %transaction.id,
            number = %transaction.transaction_number,
            "Inserting sale transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_transactions (
                id, tenant_id, transaction_number, customer_id, subtotal, tax_amount,
                discount_amount, total_amount, payment_method, status, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.tenant_id)
        .bind(&transaction.transaction_number)
        .bind(&transaction.customer_id)
        .bind(transaction.subtotal)
        .bind(transaction.tax_amount)
        .bind(transaction.discount_amount)
        .bind(transaction.total_amount)
        .bind(transaction.payment_method)
        .bind(transaction.status)
        .bind(&transaction.notes)
        .bind(transaction.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_line_in(conn: &mut SqliteConnection, line: &SaleLineItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_line_items (
                id, transaction_id, product_id, product_name, quantity,
                unit_price, subtotal, tax_amount, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.transaction_id)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .bind(line.tax_amount)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<SaleTransaction>> {
        let transaction = sqlx::query_as::<_, SaleTransaction>(
            r#"
            SELECT id, tenant_id, transaction_number, customer_id, subtotal, tax_amount,
                   discount_amount, total_amount, payment_method, status, notes, created_at
            FROM sale_transactions
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Lines of a transaction in insertion order.
    pub async fn get_lines(&self, transaction_id: &str) -> DbResult<Vec<SaleLineItem>> {
        let lines = sqlx::query_as::<_, SaleLineItem>(
            r#"
            SELECT id, transaction_id, product_id, product_name, quantity,
                   unit_price, subtotal, tax_amount, created_at
            FROM sale_line_items
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    pub async fn count_for_tenant(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_transactions WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count_lines_for_tenant(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM sale_line_items l
            INNER JOIN sale_transactions t ON t.id = l.transaction_id
            WHERE t.tenant_id = ?1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::fixtures::{self, TENANT};
    use meridian_core::{Money, PaymentMethod, SaleStatus};

    fn transaction(id: &str, number: &str) -> SaleTransaction {
        SaleTransaction {
            id: id.to_string(),
            tenant_id: TENANT.to_string(),
            transaction_number: number.to_string(),
            customer_id: None,
            subtotal: Money::from_cents(1_000),
            tax_amount: Money::from_cents(70),
            discount_amount: Money::zero(),
            total_amount: Money::from_cents(1_070),
            payment_method: PaymentMethod::Card,
            status: SaleStatus::Completed,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_transaction_numbers_are_sequential_per_tenant() {
        let db = fixtures::memory_db().await;
        let at = Utc::now();
        let mut conn = db.pool().acquire().await.unwrap();

        let first = SaleRepository::next_transaction_number_in(&mut conn, TENANT, at)
            .await
            .unwrap();
        let second = SaleRepository::next_transaction_number_in(&mut conn, TENANT, at)
            .await
            .unwrap();
        let other = SaleRepository::next_transaction_number_in(&mut conn, "tenant-b", at)
            .await
            .unwrap();

        assert!(first.ends_with("-000001"));
        assert!(second.ends_with("-000002"));
        assert!(other.ends_with("-000001"));
    }

    #[tokio::test]
    async fn test_rolled_back_number_is_reused() {
        let db = fixtures::memory_db().await;
        let at = Utc::now();

        let mut tx = db.pool().begin().await.unwrap();
        let abandoned = SaleRepository::next_transaction_number_in(&mut tx, TENANT, at)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let kept = SaleRepository::next_transaction_number_in(&mut tx, TENANT, at)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(abandoned, kept);
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = fixtures::memory_db().await;
        fixtures::insert_product(&db, "p1", "Cola", 500, true).await;

        let txn = transaction("t1", "TXN-20260301-000001");
        let line = SaleLineItem {
            id: "l1".to_string(),
            transaction_id: "t1".to_string(),
            product_id: "p1".to_string(),
            product_name: "Cola".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(500),
            subtotal: Money::from_cents(1_000),
            tax_amount: Money::from_cents(70),
            created_at: txn.created_at,
        };

        let mut tx = db.pool().begin().await.unwrap();
        SaleRepository::insert_transaction_in(&mut tx, &txn).await.unwrap();
        SaleRepository::insert_line_in(&mut tx, &line).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.sales().get_by_id(TENANT, "t1").await.unwrap().unwrap();
        assert_eq!(stored.total_amount.cents(), 1_070);
        assert_eq!(stored.payment_method, PaymentMethod::Card);
        assert!(stored.is_balanced());
        assert!(db.sales().get_by_id("tenant-b", "t1").await.unwrap().is_none());

        let lines = db.sales().get_lines("t1").await.unwrap();
        assert_eq!(lines, vec![line]);
        assert_eq!(db.sales().count_for_tenant(TENANT).await.unwrap(), 1);
        assert_eq!(db.sales().count_lines_for_tenant(TENANT).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unbalanced_transaction_rejected_by_schema() {
        let db = fixtures::memory_db().await;
        let mut txn = transaction("t1", "TXN-20260301-000001");
        txn.total_amount = Money::from_cents(999);

        let mut conn = db.pool().acquire().await.unwrap();
        let err = SaleRepository::insert_transaction_in(&mut conn, &txn)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
    }
}
