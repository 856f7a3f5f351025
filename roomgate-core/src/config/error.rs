//! Configuration errors.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    FileReadError(String),

    /// The configuration file is not valid TOML for [`super::RoomgateConfig`].
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// An environment override could not be parsed.
    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    /// The configuration parsed but is inconsistent.
    #[error("Config validation failed: {0}")]
    ValidationFailed(String),
}
