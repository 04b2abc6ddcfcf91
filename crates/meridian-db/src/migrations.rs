//! # Database Migrations
//!
//! Schema files under `migrations/sqlite/` are embedded at compile time.
//!
//! | File | Tables |
//! |---|---|
//! | `001_catalog.sql` | products, customers |
//! | `002_stock_ledger.sql` | stock_records, stock_movements, stock_reconciliation_flags |
//! | `003_sales.sql` | transaction_counters, sale_transactions, sale_line_items |
//! | `004_recommendations.sql` | purchase_patterns, co_purchase_patterns |
//!
//! Never edit an applied migration; add the next numbered file instead.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("All migrations applied successfully");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
