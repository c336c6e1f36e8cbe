//! Configuration management for Endolla
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{EndollaError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Open-data endpoint publishing the Endolla network snapshot
pub const ENDOLLA_URL: &str =
    "https://opendata-ajuntament.barcelona.cat/resources/bcn/Endolla/Endolla.json";

/// Overall request timeout for one feed fetch
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

/// Fixed refresh cadence
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 5 * 60;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ENDOLLA_CONFIG";

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Stations to track, one config entry each
    pub stations: Vec<StationConfig>,

    /// Remote feed settings
    pub feed: FeedConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// One configured station entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StationConfig {
    /// Station identifier as it appears in the feed
    pub station_id: String,

    /// Optional display title for the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StationConfig {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            name: None,
        }
    }

    /// Title shown for the entry in listings
    pub fn title(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Endolla Station {}", self.station_id),
        }
    }

    /// Accepts any non-empty identifier; its shape is not checked further
    pub fn validate(&self) -> Result<()> {
        if self.station_id.is_empty() {
            return Err(EndollaError::validation(
                "station_id",
                "Station ID cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Remote feed settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeedConfig {
    /// URL of the open-data JSON document
    pub url: String,

    /// Overall request timeout in seconds (connect + read)
    pub timeout_secs: u64,

    /// Refresh interval in seconds
    pub update_interval_secs: u64,

    /// User-Agent header sent with each request
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file
    pub file: String,

    /// Number of rotated daily files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the HTTP API
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: ENDOLLA_URL.to_string(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            user_agent: format!("endolla/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/endolla.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.update_interval_secs)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `ENDOLLA_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(path);
        }

        let default_paths = [
            "endolla.yaml",
            "/data/endolla.yaml",
            "/etc/endolla/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for station in &self.stations {
            station.validate()?;
            if !seen.insert(station.station_id.as_str()) {
                return Err(EndollaError::validation(
                    "stations".to_string(),
                    format!("Duplicate station ID: {}", station.station_id),
                ));
            }
        }

        if self.feed.url.trim().is_empty() {
            return Err(EndollaError::validation(
                "feed.url",
                "Feed URL cannot be empty",
            ));
        }

        if self.feed.timeout_secs == 0 {
            return Err(EndollaError::validation(
                "feed.timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.feed.update_interval_secs == 0 {
            return Err(EndollaError::validation(
                "feed.update_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(EndollaError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.stations.is_empty());
        assert_eq!(config.feed.url, ENDOLLA_URL);
        assert_eq!(config.feed.timeout_secs, 15);
        assert_eq!(config.feed.update_interval_secs, 300);
        assert!(config.web.enabled);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.stations.push(StationConfig::new(""));
        assert!(config.validate().is_err());

        // Only emptiness is checked, not the shape of the identifier
        config = Config::default();
        config.stations.push(StationConfig::new("  "));
        assert!(config.validate().is_ok());

        config = Config::default();
        config.stations = vec![StationConfig::new("A1"), StationConfig::new("A1")];
        assert!(config.validate().is_err());

        config = Config::default();
        config.feed.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn station_title_prefers_configured_name() {
        let mut station = StationConfig::new("5091");
        assert_eq!(station.title(), "Endolla Station 5091");
        station.name = Some("Home".to_string());
        assert_eq!(station.title(), "Home");
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = "stations:\n  - station_id: \"ES-123\"\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stations.len(), 1);
        assert_eq!(config.stations[0].station_id, "ES-123");
        assert_eq!(config.feed.timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(config.web.port, 8089);
    }
}
