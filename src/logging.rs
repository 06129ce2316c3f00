//! Logging setup
//!
//! Installs a global `tracing` subscriber writing to stderr. `RUST_LOG`
//! overrides the configured level.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber
///
/// Returns `Ok(false)` when a subscriber was already installed, e.g. by the
/// embedding application or an earlier call.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| ConfigError::Invalid {
            message: format!("logging.level '{}': {}", config.level, e),
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    Ok(installed.is_ok())
}
