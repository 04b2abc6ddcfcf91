//! Test fixtures: migrated in-memory databases with a seeded catalog.
//!
//! Available to this crate's tests and, through the `test-util` feature,
//! to the tests of `meridian-events` and `meridian-sales`. Helpers panic on
//! failure.

use chrono::Utc;
use meridian_core::{Customer, Money, Product, DEFAULT_LOCATION, DEFAULT_TENANT_ID};

use crate::{Database, DbConfig};

pub const TENANT: &str = DEFAULT_TENANT_ID;

/// Fresh single-connection in-memory database with migrations applied.
pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// An active product with no tax rate of its own. Not persisted.
pub fn product(id: &str, name: &str, price_cents: i64) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        tenant_id: TENANT.to_string(),
        sku: format!("SKU-{}", id.to_uppercase().replace(|c: char| !c.is_alphanumeric(), "-")),
        barcode: None,
        name: name.to_string(),
        category_id: None,
        cost_price: Money::from_cents(price_cents / 2),
        selling_price: Money::from_cents(price_cents),
        tax_rate_bps: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub async fn insert_product(
    db: &Database,
    id: &str,
    name: &str,
    price_cents: i64,
    active: bool,
) -> Product {
    let mut product = product(id, name, price_cents);
    product.is_active = active;
    db.products().insert(&product).await.expect("insert product")
}

/// Inserts an active product and stocks it at the default location.
pub async fn seed_product(
    db: &Database,
    id: &str,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> Product {
    let product = insert_product(db, id, name, price_cents, true).await;
    db.ledger()
        .set_absolute(id, TENANT, DEFAULT_LOCATION, stock)
        .await
        .expect("stock product");
    product
}

pub async fn seed_customer(db: &Database, id: &str) -> Customer {
    let customer = Customer {
        id: id.to_string(),
        tenant_id: TENANT.to_string(),
        name: format!("Customer {id}"),
        email: None,
        loyalty_points: 0,
        total_spent: Money::zero(),
        last_visit: None,
        created_at: Utc::now(),
    };
    db.customers().insert(&customer).await.expect("insert customer")
}
