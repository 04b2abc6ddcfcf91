//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Used when neither `RUST_LOG` nor `[logging] filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,meridian=debug,sqlx=warn";

/// Installs the global `tracing` subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - everything at debug
/// - `RUST_LOG=meridian::reconciliation=warn` - only reconciliation flags
/// - otherwise `filter` (usually `[logging] filter` from `pos.toml`)
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
