//! Configuration management for natureid.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote taxa service
    pub api: ApiConfig,

    /// Common names
    pub names: NamesConfig,

    /// Prediction output
    pub prediction: PredictionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/org.natureid.natureid/config.toml
    /// - Linux: ~/.config/natureid/config.toml
    ///
    /// Falls back to ~/.natureid/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "natureid", "natureid")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| Self::home_fallback().join("config.toml"))
    }

    fn home_fallback() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".natureid")
    }

    /// Resolved data directory (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let path_str = self.general.data_dir.to_string_lossy();
        PathBuf::from(shellexpand::tilde(&path_str).into_owned())
    }

    /// Resolved path of the reference taxonomy archive.
    pub fn taxonomy_archive(&self) -> PathBuf {
        let path_str = self.general.taxonomy_archive.to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(&path_str).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }

    /// Resolved API response cache file.
    ///
    /// Defaults to the platform cache directory, e.g. `~/.cache/natureid` on Linux.
    pub fn api_cache_path(&self) -> PathBuf {
        if let Some(path) = &self.api.cache_path {
            let path_str = path.to_string_lossy();
            return PathBuf::from(shellexpand::tilde(&path_str).into_owned());
        }
        directories::ProjectDirs::from("org", "natureid", "natureid")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| Self::home_fallback().join("cache"))
            .join("api.cache.json")
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
