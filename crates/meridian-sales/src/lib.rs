//! # meridian-sales: Sale Transaction Service for Meridian POS
//!
//! Records sales atomically and hands them to the event handlers.
//!
//! ## Runtime Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PosConfig::load ──► init_tracing ──► Database::new (migrations)        │
//! │                                             │                           │
//! │                      Dispatcher::new ◄──────┤                           │
//! │                           │                 │                           │
//! │     subscribe_sale_handlers(inventory, recommendations)                 │
//! │                           │                                             │
//! │                           ▼                                             │
//! │                     SaleService ── create_sale ──► publish              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_sales::{CreateSaleInput, PosConfig, PosRuntime};
//!
//! let runtime = PosRuntime::start(PosConfig::load(None)?).await?;
//! let sale = runtime
//!     .sales()
//!     .create_sale(CreateSaleInput::new(tenant_id, "cash").item("espresso", 2))
//!     .await?;
//! println!("{}", sale.transaction.transaction_number);
//! runtime.shutdown().await;
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{PosConfig, TaxMode};
pub use error::{ConfigError, ConfigResult, SaleError, SaleResult, StartupError};
pub use service::{CompletedSale, CreateSaleInput, SaleLineInput, SaleService, SaleSettings};
pub use telemetry::{init_tracing, DEFAULT_LOG_FILTER};

use meridian_core::StockRecord;
use meridian_db::{Database, StockResult};
use meridian_events::{subscribe_sale_handlers, Dispatcher, EventKind};
use tracing::info;

/// Everything a till needs: database, dispatcher with handlers subscribed,
/// and the sale service.
#[derive(Debug, Clone)]
pub struct PosRuntime {
    config: PosConfig,
    db: Database,
    dispatcher: Dispatcher,
    sales: SaleService,
}

impl PosRuntime {
    /// Validates `config`, installs tracing, opens the database and wires
    /// the sale-completed handlers.
    pub async fn start(config: PosConfig) -> Result<Self, StartupError> {
        config.validate()?;
        init_tracing(&config.logging.filter);

        let db = Database::new(config.db_config()).await?;
        Ok(Self::with_database(config, db))
    }

    /// Wires a runtime around an already open database.
    pub fn with_database(config: PosConfig, db: Database) -> Self {
        let dispatcher = Dispatcher::new();
        subscribe_sale_handlers(&dispatcher, &db, &config.sales.default_location);

        let sales = SaleService::new(db.clone(), dispatcher.clone(), config.sale_settings());

        info!(
            tax_mode = %config.sales.tax_mode,
            location = %config.sales.default_location,
            subscribers = dispatcher.subscriber_count(EventKind::SaleCompleted),
            "POS runtime ready"
        );

        PosRuntime {
            config,
            db,
            dispatcher,
            sales,
        }
    }

    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    pub fn sales(&self) -> &SaleService {
        &self.sales
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stock records at or below the configured threshold.
    pub async fn low_stock(&self, tenant_id: &str) -> StockResult<Vec<StockRecord>> {
        self.db
            .ledger()
            .low_stock(tenant_id, self.config.inventory.low_stock_threshold)
            .await
    }

    pub async fn shutdown(&self) {
        info!("Shutting down POS runtime");
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_db::fixtures::{self, TENANT};

    #[tokio::test]
    async fn test_runtime_end_to_end() {
        let db = fixtures::memory_db().await;
        fixtures::seed_product(&db, "a", "A", 1_000, 12).await;
        fixtures::seed_product(&db, "b", "B", 500, 3).await;

        let runtime = PosRuntime::with_database(PosConfig::default(), db);

        let (sale, fan_out) = runtime
            .sales()
            .create_sale_tracked(CreateSaleInput::new(TENANT, "cash").item("a", 3).item("b", 1))
            .await
            .unwrap();
        fan_out.wait().await;

        assert_eq!(sale.transaction.subtotal.cents(), 3_500);
        assert_eq!(sale.transaction.tax_amount.cents(), 245);
        assert_eq!(sale.transaction.total_amount.cents(), 3_745);

        let low: Vec<String> = runtime
            .low_stock(TENANT)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.product_id)
            .collect();
        assert_eq!(low, vec!["b".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut config = PosConfig::default();
        config.sales.flat_tax_rate_bps = 20_000;

        let err = PosRuntime::start(config).await.unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Invalid(_))));
    }
}
