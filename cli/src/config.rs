// Configuration management for the background locator harness
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/background-locator/config.json
// - Linux: ~/.config/background-locator/config.json
// - Windows: %APPDATA%\background-locator\config.json

use anyhow::{Context, Result};
use background_locator_core::LocationClient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "background-locator";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preference database location; defaults to the data directory
    pub storage_path: Option<String>,

    /// Backend written to the preferences when `run` is not given one
    pub default_provider: LocationClient,

    /// Handle registered for location deliveries
    pub callback_handle: i64,

    /// Interval injected into START when the command carries none
    pub fix_interval_ms: u64,

    /// Simulator settings
    pub simulator: SimulatorConfig,

    /// Also write logs to this file
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub origin_latitude: f64,
    pub origin_longitude: f64,

    /// Largest displacement per fix, in meters
    pub max_step_meters: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: None,
            default_provider: LocationClient::default(),
            callback_handle: 1,
            fix_interval_ms: 1000,
            simulator: SimulatorConfig::default(),
            log_file: None,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            origin_latitude: 52.5200,
            origin_longitude: 13.4050,
            max_step_meters: 25.0,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_DIR);

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join(APP_DIR);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default file, or create it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Directory holding the preference database
    pub fn preferences_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("preferences")),
        }
    }

    /// Set a config value (in memory; call `save` to persist)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "storage_path" => {
                self.storage_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "default_provider" => {
                self.default_provider = value.parse().context("Invalid provider")?;
            }
            "callback_handle" => {
                self.callback_handle = value.parse().context("Invalid callback handle")?;
            }
            "fix_interval_ms" => {
                self.fix_interval_ms = value.parse().context("Invalid number")?;
            }
            "origin_latitude" => {
                let latitude: f64 = value.parse().context("Invalid latitude")?;
                if !(-90.0..=90.0).contains(&latitude) {
                    anyhow::bail!("Latitude out of range: {}", latitude);
                }
                self.simulator.origin_latitude = latitude;
            }
            "origin_longitude" => {
                let longitude: f64 = value.parse().context("Invalid longitude")?;
                if !(-180.0..=180.0).contains(&longitude) {
                    anyhow::bail!("Longitude out of range: {}", longitude);
                }
                self.simulator.origin_longitude = longitude;
            }
            "max_step_meters" => {
                self.simulator.max_step_meters = value.parse().context("Invalid number")?;
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "storage_path" => self.storage_path.clone(),
            "default_provider" => Some(self.default_provider.to_string()),
            "callback_handle" => Some(self.callback_handle.to_string()),
            "fix_interval_ms" => Some(self.fix_interval_ms.to_string()),
            "origin_latitude" => Some(self.simulator.origin_latitude.to_string()),
            "origin_longitude" => Some(self.simulator.origin_longitude.to_string()),
            "max_step_meters" => Some(self.simulator.max_step_meters.to_string()),
            "log_file" => self.log_file.clone(),
            _ => None,
        }
    }

    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "storage_path".to_string(),
                self.storage_path.clone().unwrap_or_else(|| "(auto)".to_string()),
            ),
            ("default_provider".to_string(), self.default_provider.to_string()),
            ("callback_handle".to_string(), self.callback_handle.to_string()),
            ("fix_interval_ms".to_string(), format!("{}ms", self.fix_interval_ms)),
            ("origin_latitude".to_string(), self.simulator.origin_latitude.to_string()),
            ("origin_longitude".to_string(), self.simulator.origin_longitude.to_string()),
            ("max_step_meters".to_string(), self.simulator.max_step_meters.to_string()),
            (
                "log_file".to_string(),
                self.log_file.clone().unwrap_or_else(|| "(none)".to_string()),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_provider, LocationClient::ThirdParty);
        assert_eq!(config.fix_interval_ms, 1000);
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("default_provider", "platform").unwrap();
        config.set("callback_handle", "99").unwrap();
        config.set("origin_latitude", "10.5").unwrap();

        assert_eq!(config.default_provider, LocationClient::Platform);
        assert_eq!(config.get("callback_handle").as_deref(), Some("99"));
        assert_eq!(config.get("origin_latitude").as_deref(), Some("10.5"));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("default_provider", "gps").is_err());
        assert!(config.set("origin_latitude", "91").is_err());
        assert!(config.set("no_such_key", "1").is_err());
        assert_eq!(config.get("no_such_key"), None);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let mut changed = config.clone();
        changed.set("fix_interval_ms", "250").unwrap();
        changed.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.fix_interval_ms, 250);
    }
}
