//! Configuration management for parkmark.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "parkmark";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "parkmark.db";

/// Allowed search-radius presets, in meters.
pub const RADIUS_PRESETS: &[u32] = &[500, 1000, 1500, 2000];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PARKMARK_`)
/// 2. TOML config file at `~/.config/parkmark/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Nearby-search configuration.
    pub search: SearchConfig,
    /// Remote sync configuration.
    pub sync: SyncConfig,
    /// Reverse-geocoding configuration.
    pub geocode: GeocodeConfig,
    /// Assistant chat configuration.
    pub assist: AssistConfig,
    /// Connectivity probe configuration.
    pub connectivity: ConnectivityConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/parkmark/parkmark.db`
    pub database_path: Option<PathBuf>,
}

/// Nearby parking search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search radius in meters; must be one of [`RADIUS_PRESETS`].
    pub radius_meters: u32,
    /// Places-search endpoint.
    pub places_url: String,
    /// API key for the places endpoint.
    pub api_key: Option<String>,
}

/// Remote sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether records are pushed to the remote collection at all.
    pub enabled: bool,
    /// Base URL of the remote document store.
    pub base_url: Option<String>,
    /// Collection name under the base URL.
    pub collection: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Reverse-geocoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Whether addresses are looked up at all.
    pub enabled: bool,
    /// Reverse-geocoding endpoint (Nominatim-style `/reverse`).
    pub reverse_url: String,
}

/// Assistant chat configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Text-generation endpoint.
    pub endpoint: String,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Model name passed to the endpoint.
    pub model: String,
    /// Maximum tokens to generate per reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Address the probe connects to (`host:port`).
    pub probe_addr: String,
    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_meters: 1000,
            places_url: "https://maps.googleapis.com/maps/api/place/nearbysearch/json"
                .to_string(),
            api_key: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            collection: "ubicaciones".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reverse_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
        }
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cohere.ai/v1/generate".to_string(),
            api_key: None,
            model: "command".to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_addr: "1.1.1.1:53".to_string(),
            timeout_ms: 1500,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `PARKMARK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PARKMARK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !RADIUS_PRESETS.contains(&self.search.radius_meters) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "radius_meters must be one of {RADIUS_PRESETS:?}, got {}",
                    self.search.radius_meters
                ),
            });
        }

        if self.sync.enabled && self.sync.base_url.is_none() {
            return Err(Error::ConfigValidation {
                message: "sync.enabled requires sync.base_url to be set".to_string(),
            });
        }

        if self.sync.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sync.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.connectivity.timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "connectivity.timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.assist.max_tokens == 0 {
            return Err(Error::ConfigValidation {
                message: "assist.max_tokens must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the sync request timeout as a Duration.
    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    /// Get the connectivity probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.timeout_ms)
    }

    /// Persist this configuration to the given file as TOML.
    ///
    /// Used when a preference (the search radius) changes from the CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    pub fn store_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("failed to render configuration: {e}")))?;
        std::fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.search.radius_meters, 1000);
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.collection, "ubicaciones");
        assert!(config.geocode.enabled);
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();
        assert!(storage.database_path.is_none());
    }

    #[test]
    fn test_default_search_config() {
        let search = SearchConfig::default();
        assert_eq!(search.radius_meters, 1000);
        assert!(search.places_url.contains("nearbysearch"));
        assert!(search.api_key.is_none());
    }

    #[test]
    fn test_default_sync_config() {
        let sync = SyncConfig::default();
        assert!(!sync.enabled);
        assert!(sync.base_url.is_none());
        assert_eq!(sync.timeout_secs, 10);
    }

    #[test]
    fn test_default_assist_config() {
        let assist = AssistConfig::default();
        assert!(assist.endpoint.contains("generate"));
        assert_eq!(assist.max_tokens, 500);
        assert!((assist.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_connectivity_config() {
        let connectivity = ConnectivityConfig::default();
        assert!(connectivity.probe_addr.contains(':'));
        assert_eq!(connectivity.timeout_ms, 1500);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_all_radius_presets() {
        for preset in RADIUS_PRESETS {
            let mut config = Config::default();
            config.search.radius_meters = *preset;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_invalid_radius() {
        let mut config = Config::default();
        config.search.radius_meters = 750;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("radius_meters"));
    }

    #[test]
    fn test_validate_sync_enabled_without_base_url() {
        let mut config = Config::default();
        config.sync.enabled = true;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("base_url"));
    }

    #[test]
    fn test_validate_sync_enabled_with_base_url() {
        let mut config = Config::default();
        config.sync.enabled = true;
        config.sync.base_url = Some("https://example.test/v1".to_string());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_probe_timeout() {
        let mut config = Config::default();
        config.connectivity.timeout_ms = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_validate_zero_sync_timeout() {
        let mut config = Config::default();
        config.sync.timeout_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();
        assert!(path.to_string_lossy().contains("parkmark.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_sync_timeout() {
        let config = Config::default();
        assert_eq!(config.sync_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_probe_timeout() {
        let config = Config::default();
        assert_eq!(config.probe_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("parkmark"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("parkmark"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[search]\nradius_meters = 1500\n\n[sync]\nenabled = true\nbase_url = \"https://example.test/v1\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.search.radius_meters, 1500);
        assert!(config.sync.enabled);
        assert_eq!(
            config.sync.base_url.as_deref(),
            Some("https://example.test/v1")
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.sync.collection, "ubicaciones");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nradius_meters = 123\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(result.is_err());
    }

    #[test]
    fn test_store_to_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.search.radius_meters = 2000;
        config.store_to(&path).unwrap();

        let loaded = Config::load_from(Some(path)).unwrap();
        assert_eq!(loaded.search.radius_meters, 2000);
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("radius_meters"));
        assert!(json.contains("probe_addr"));
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
