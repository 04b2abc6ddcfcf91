//! # Product Repository
//!
//! Catalog reads for the sale pipeline, plus `insert` for seeding.
//! Stock levels live in the Stock Ledger, not on the product row.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use meridian_core::validation::{validate_price, validate_required, validate_sku, validate_tax_rate_bps};
use meridian_core::Product;

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, barcode, name, category_id, cost_price, \
     selling_price, tax_rate_bps, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product after validating SKU, name, prices and tax rate.
    ///
    /// ## Errors
    /// * `DbError::Validation` - bad input, nothing written
    /// * `DbError::UniqueViolation` - SKU already used by this tenant
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_required("name", &product.name)?;
        validate_price("selling_price", product.selling_price)?;
        validate_price("cost_price", product.cost_price)?;
        validate_tax_rate_bps(product.tax_rate_bps)?;

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, barcode, name, category_id, cost_price,
                selling_price, tax_rate_bps, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.cost_price)
        .bind(product.selling_price)
        .bind(product.tax_rate_bps)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Gets a product by ID within a tenant, active or not.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Looks up a sellable product on the caller's connection.
    ///
    /// Inactive products and other tenants' products come back as `None`.
    pub async fn find_active_in(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
