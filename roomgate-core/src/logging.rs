//! Tracing setup.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! host application's choice. [`init_logging`] wires up the usual one.
//!
//! Access decisions are logged on the [`AUDIT_TARGET`] target so they can be
//! routed separately, e.g. `RUST_LOG=info,location_audit=info`.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Target used for access-decision audit events.
pub const AUDIT_TARGET: &str = "location_audit";

/// Errors raised while installing the subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber is already installed, or the filter is invalid.
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`.
///
/// # Errors
///
/// Returns [`LoggingError::InitializationFailed`] if a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;

    let fmt_layer = fmt::layer().with_target(true);

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    }

    Ok(())
}
