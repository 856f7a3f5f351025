//! Configuration management for Roomgate.
//!
//! Configuration is read from a TOML file, then overridden by environment
//! variables of the form `ROOMGATE_<SECTION>_<KEY>`, then validated.
//!
//! ```toml
//! [store]
//! database_path = "/var/lib/roomgate/roomgate.db"
//! pool_size = 8
//! lock_timeout = "5s"
//!
//! [search]
//! default_radius_meters = 10000.0
//! max_radius_meters = 100000.0
//!
//! [logging]
//! level = "info"
//! json_format = true
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod error;

pub use error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomgateConfig {
    /// Persistence settings.
    pub store: StoreConfig,
    /// Discovery search limits.
    pub search: SearchConfig,
    /// Tracing output.
    pub logging: LoggingConfig,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `SQLite` database file.
    pub database_path: PathBuf,

    /// Maximum pooled connections.
    pub pool_size: u32,

    /// How long a mutation waits for its room (and a connection) before
    /// failing with a transient error.
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
}

/// Discovery search limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Radius used when a search gives an origin but no radius.
    pub default_radius_meters: f64,
    /// Largest radius a search may request.
    pub max_radius_meters: f64,
    /// Page size used when a search gives no limit.
    pub default_page_size: u32,
    /// Largest page a search may request.
    pub max_page_size: u32,
}

/// Tracing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./roomgate.db"),
            pool_size: 8,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: 10_000.0,
            max_radius_meters: 100_000.0,
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl RoomgateConfig {
    /// Loads defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or the result is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an override is
    /// malformed, or validation fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `ROOMGATE_<SECTION>_<KEY>` overrides using `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = lookup("ROOMGATE_STORE_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(size) = lookup("ROOMGATE_STORE_POOL_SIZE") {
            self.store.pool_size = parse_value(&size, "pool size")?;
        }
        if let Some(timeout) = lookup("ROOMGATE_STORE_LOCK_TIMEOUT") {
            self.store.lock_timeout = humantime_serde::deserialize(toml::Value::String(timeout))
                .map_err(|e: toml::de::Error| {
                    ConfigError::InvalidValue(format!("Invalid lock timeout: {e}"))
                })?;
        }

        if let Some(radius) = lookup("ROOMGATE_SEARCH_DEFAULT_RADIUS_METERS") {
            self.search.default_radius_meters = parse_value(&radius, "default radius")?;
        }
        if let Some(radius) = lookup("ROOMGATE_SEARCH_MAX_RADIUS_METERS") {
            self.search.max_radius_meters = parse_value(&radius, "max radius")?;
        }
        if let Some(size) = lookup("ROOMGATE_SEARCH_DEFAULT_PAGE_SIZE") {
            self.search.default_page_size = parse_value(&size, "default page size")?;
        }
        if let Some(size) = lookup("ROOMGATE_SEARCH_MAX_PAGE_SIZE") {
            self.search.max_page_size = parse_value(&size, "max page size")?;
        }

        if let Some(level) = lookup("ROOMGATE_LOGGING_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(json) = lookup("ROOMGATE_LOGGING_JSON_FORMAT") {
            self.logging.json_format = parse_value(&json, "JSON flag")?;
        }

        Ok(())
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationFailed`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }
        if self.store.lock_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "lock_timeout must be greater than 0".to_string(),
            ));
        }

        let search = &self.search;
        if !(search.max_radius_meters.is_finite() && search.max_radius_meters > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "max_radius_meters must be positive".to_string(),
            ));
        }
        if !(search.default_radius_meters > 0.0
            && search.default_radius_meters <= search.max_radius_meters)
        {
            return Err(ConfigError::ValidationFailed(
                "default_radius_meters must be positive and at most max_radius_meters".to_string(),
            ));
        }
        if search.max_page_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_page_size must be greater than 0".to_string(),
            ));
        }
        if search.default_page_size == 0 || search.default_page_size > search.max_page_size {
            return Err(ConfigError::ValidationFailed(
                "default_page_size must be between 1 and max_page_size".to_string(),
            ));
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

fn parse_value<T>(raw: &str, what: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = RoomgateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.default_radius_meters, 10_000.0);
        assert_eq!(config.search.max_page_size, 100);
        assert_eq!(config.store.lock_timeout, Duration::from_secs(5));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = RoomgateConfig::default();
        config
            .apply_env(lookup(&[
                ("ROOMGATE_STORE_POOL_SIZE", "4"),
                ("ROOMGATE_STORE_LOCK_TIMEOUT", "250ms"),
                ("ROOMGATE_SEARCH_MAX_PAGE_SIZE", "20"),
                ("ROOMGATE_SEARCH_DEFAULT_PAGE_SIZE", "10"),
                ("ROOMGATE_LOGGING_LEVEL", "DEBUG"),
                ("ROOMGATE_LOGGING_JSON_FORMAT", "true"),
            ]))
            .unwrap();

        assert_eq!(config.store.pool_size, 4);
        assert_eq!(config.store.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.search.max_page_size, 20);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_override_is_rejected() {
        let mut config = RoomgateConfig::default();
        let err = config
            .apply_env(lookup(&[("ROOMGATE_STORE_POOL_SIZE", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn validation_catches_inconsistencies() {
        let mut config = RoomgateConfig::default();
        config.store.pool_size = 0;
        assert!(config.validate().is_err());

        let mut config = RoomgateConfig::default();
        config.search.default_radius_meters = 200_000.0;
        assert!(config.validate().is_err());

        let mut config = RoomgateConfig::default();
        config.search.default_page_size = 500;
        assert!(config.validate().is_err());

        let mut config = RoomgateConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roomgate.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[store]\npool_size = 2\nlock_timeout = \"2s\"\n\n[search]\nmax_radius_meters = 50000.0"
        )
        .unwrap();

        let config = RoomgateConfig::from_file(&path).unwrap();
        assert_eq!(config.store.pool_size, 2);
        assert_eq!(config.store.lock_timeout, Duration::from_secs(2));
        assert_eq!(config.search.max_radius_meters, 50_000.0);
        assert_eq!(config.search.default_page_size, 50);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = RoomgateConfig::from_file("/nonexistent/roomgate.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError(_)));
    }
}
