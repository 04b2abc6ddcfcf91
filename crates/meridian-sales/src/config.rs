//! # POS Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     MERIDIAN_DB_PATH=/var/lib/meridian/pos.db                           │
//! │     MERIDIAN_TAX_MODE=per_line                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/pos/pos.toml (Linux)                                      │
//! │     ~/Library/Application Support/com.meridian.pos/pos.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "meridian.db"
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [sales]
//! tax_mode = "flat"          # flat | per_line
//! flat_tax_rate_bps = 700    # 7%
//! default_location = "main"
//! max_item_quantity = 999
//!
//! [inventory]
//! low_stock_threshold = 10
//!
//! [logging]
//! filter = "info,meridian=debug,sqlx=warn"
//! ```

use meridian_core::validation::validate_tax_rate_bps;
use meridian_core::{
    TaxPolicy, TaxRate, DEFAULT_LOCATION, DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_TAX_RATE_BPS,
    MAX_ITEM_QUANTITY,
};
use meridian_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::service::SaleSettings;
use crate::telemetry::DEFAULT_LOG_FILTER;

// =============================================================================
// Tax Mode
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// `flat_tax_rate_bps` on the order subtotal.
    #[default]
    Flat,

    /// Each product's own tax rate on its line.
    PerLine,
}

impl std::fmt::Display for TaxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxMode::Flat => write!(f, "flat"),
            TaxMode::PerLine => write!(f, "per_line"),
        }
    }
}

impl std::str::FromStr for TaxMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" | "flat_order" | "order" => Ok(TaxMode::Flat),
            "per_line" | "per-line" | "line" => Ok(TaxMode::PerLine),
            other => Err(ConfigError::Invalid(format!(
                "Unknown tax mode: '{}'. Valid options: flat, per_line",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("meridian.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSettings {
    #[serde(default)]
    pub tax_mode: TaxMode,

    /// Used when `tax_mode = "flat"`. Default: 700 (7%)
    #[serde(default = "default_flat_tax_rate")]
    pub flat_tax_rate_bps: u32,

    /// Stock location sales are checked and deducted against.
    #[serde(default = "default_location")]
    pub default_location: String,

    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: i64,
}

fn default_flat_tax_rate() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_max_item_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            tax_mode: TaxMode::default(),
            flat_tax_rate_bps: default_flat_tax_rate(),
            default_location: default_location(),
            max_item_quantity: default_max_item_quantity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Quantity at or below which a product counts as low on stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives. `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// PosConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl PosConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`pos.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading POS config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load POS config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "POS config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.database.busy_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_secs must be greater than 0".into(),
            ));
        }
        validate_tax_rate_bps(self.sales.flat_tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(format!("sales.flat_tax_rate_bps: {}", e)))?;
        if self.sales.default_location.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sales.default_location must not be empty".into(),
            ));
        }
        if self.sales.max_item_quantity < 1 {
            return Err(ConfigError::Invalid(
                "sales.max_item_quantity must be at least 1".into(),
            ));
        }
        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "inventory.low_stock_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `MERIDIAN_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("MERIDIAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("MERIDIAN_DB_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %value, "Ignoring invalid MERIDIAN_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("MERIDIAN_TAX_MODE") {
            match value.parse() {
                Ok(mode) => {
                    debug!(mode = %value, "Overriding tax mode from environment");
                    self.sales.tax_mode = mode;
                }
                Err(e) => warn!("Ignoring MERIDIAN_TAX_MODE: {}", e),
            }
        }

        if let Some(value) = lookup("MERIDIAN_FLAT_TAX_BPS") {
            match value.parse() {
                Ok(bps) => self.sales.flat_tax_rate_bps = bps,
                Err(_) => warn!(value = %value, "Ignoring invalid MERIDIAN_FLAT_TAX_BPS"),
            }
        }

        if let Some(location) = lookup("MERIDIAN_LOCATION") {
            self.sales.default_location = location;
        }

        if let Some(value) = lookup("MERIDIAN_LOW_STOCK_THRESHOLD") {
            match value.parse() {
                Ok(threshold) => self.inventory.low_stock_threshold = threshold,
                Err(_) => warn!(value = %value, "Ignoring invalid MERIDIAN_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(filter) = lookup("MERIDIAN_LOG") {
            self.logging.filter = filter;
        }
    }

    /// `pos.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "meridian", "pos")
            .map(|dirs| dirs.config_dir().join("pos.toml"))
    }

    pub fn tax_policy(&self) -> TaxPolicy {
        match self.sales.tax_mode {
            TaxMode::Flat => TaxPolicy::FlatOrder(TaxRate::from_bps(self.sales.flat_tax_rate_bps)),
            TaxMode::PerLine => TaxPolicy::PerLine,
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn sale_settings(&self) -> SaleSettings {
        SaleSettings {
            tax_policy: self.tax_policy(),
            location_id: self.sales.default_location.clone(),
            max_item_quantity: self.sales.max_item_quantity,
        }
    }
}
