//! Application configuration.
//!
//! Loaded from a `config.yaml` next to the data directory, with every
//! field optional, plus a `.env` override for the API base URL so local
//! setups can point at a dev backend without editing the config file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::strategy::{DeviceClass, LoadStrategy, StrategyThresholds};

const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// IANA zone scheduling inputs are interpreted in.
    pub timezone: String,
    pub strategy_thresholds: StrategyThresholds,
    /// Test/debug override: skip strategy selection entirely.
    pub forced_strategy: Option<LoadStrategy>,
    /// Override the detected device class.
    pub device_class: Option<DeviceClass>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            strategy_thresholds: StrategyThresholds::default(),
            forced_strategy: None,
            device_class: None,
        }
    }
}

impl AppConfig {
    /// Reads `config.yaml`, falling back to defaults when the file is
    /// missing. A `.env` in the same directory can override the API URL.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            log::info!("no config at {}, using defaults", path.display());
            Self::default()
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(url) = load_env_value(dir, "POSTDECK_API_URL") {
            log::info!("API base URL overridden from .env");
            config.api_base_url = url;
        }
        Ok(config)
    }

    /// Configured device class, or the one detected from the host.
    pub fn device_class(&self) -> DeviceClass {
        self.device_class.unwrap_or_else(DeviceClass::detect)
    }
}

/// Load a value from the .env file by key name
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let env_path = dir.join(".env");
    let prefix = format!("{}=", key);
    if let Ok(content) = std::fs::read_to_string(&env_path) {
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with(&prefix) {
                let value = trimmed[prefix.len()..]
                    .trim()
                    .trim_matches('"')
                    .trim_matches('\'');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("config.yaml")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timezone, "UTC");
        assert!(config.forced_strategy.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "timezone: America/New_York\nforced_strategy: server\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.forced_strategy, Some(LoadStrategy::Server));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.strategy_thresholds, StrategyThresholds::default());
    }

    #[test]
    fn test_env_file_overrides_api_url() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".env"),
            "# local backend\nPOSTDECK_API_URL=\"http://localhost:9999/api\"\n",
        )
        .unwrap();

        let config = AppConfig::load(&temp.path().join("config.yaml")).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9999/api");
    }

    #[test]
    fn test_threshold_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "strategy_thresholds:\n  desktop: 1000\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.strategy_thresholds.desktop, 1000);
        // Unlisted thresholds keep their defaults.
        assert_eq!(config.strategy_thresholds.mobile, 50);
    }
}
