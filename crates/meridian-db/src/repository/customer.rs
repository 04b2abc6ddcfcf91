//! # Customer Repository
//!
//! The sale pipeline only reads customers and accrues loyalty on them.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::validation::validate_required;
use meridian_core::{Customer, Money};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        validate_required("name", &customer.name)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, tenant_id, name, email, loyalty_points, total_spent, last_visit, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.tenant_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(customer.total_spent)
        .bind(customer.last_visit)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, tenant_id, name, email, loyalty_points, total_spent, last_visit, created_at
            FROM customers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Same lookup on the caller's connection.
    pub async fn find_in(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, tenant_id, name, email, loyalty_points, total_spent, last_visit, created_at
            FROM customers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(customer)
    }

    /// Adds loyalty points and spend, and stamps the visit, on the caller's
    /// transaction.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such customer for this tenant; the caller
    ///   should roll back
    pub async fn accrue_loyalty_in(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        customer_id: &str,
        points: i64,
        spent: Money,
        visited_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(customer_id, points, "Accruing loyalty");

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET loyalty_points = loyalty_points + ?1,
                total_spent = total_spent + ?2,
                last_visit = ?3
            WHERE id = ?4 AND tenant_id = ?5
            "#,
        )
        .bind(points)
        .bind(spent)
        .bind(visited_at)
        .bind(customer_id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, TENANT};

    #[tokio::test]
    async fn test_accrue_loyalty() {
        let db = fixtures::memory_db().await;
        fixtures::seed_customer(&db, "c1").await;

        let mut tx = db.pool().begin().await.unwrap();
        CustomerRepository::accrue_loyalty_in(
            &mut tx,
            TENANT,
            "c1",
            2,
            Money::from_cents(25_000),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let customer = db.customers().get_by_id(TENANT, "c1").await.unwrap().unwrap();
        assert_eq!(customer.loyalty_points, 2);
        assert_eq!(customer.total_spent.cents(), 25_000);
        assert!(customer.last_visit.is_some());
    }

    #[tokio::test]
    async fn test_accrue_unknown_customer() {
        let db = fixtures::memory_db().await;

        let mut conn = db.pool().acquire().await.unwrap();
        let err = CustomerRepository::accrue_loyalty_in(
            &mut conn,
            TENANT,
            "nobody",
            1,
            Money::from_cents(100),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
