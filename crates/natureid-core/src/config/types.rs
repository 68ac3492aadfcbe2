//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the reference taxonomy and classifiers
    pub data_dir: PathBuf,

    /// Reference taxonomy archive (Darwin Core zip). Relative paths are
    /// resolved against `data_dir`.
    pub taxonomy_archive: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.natureid"),
            taxonomy_archive: PathBuf::from(
                "inaturalist-taxonomy/inaturalist-taxonomy.dwca.zip",
            ),
        }
    }
}

/// Remote taxa service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the taxa API
    pub base_url: String,

    /// Response cache file. Defaults to the platform cache directory.
    pub cache_path: Option<PathBuf>,

    /// Days before a cached response is fetched again
    pub cache_ttl_days: u64,

    /// Max calls that may start within `interval_secs`
    pub max_calls: usize,

    /// Throttle window in seconds
    pub interval_secs: u64,

    /// First sleep after HTTP 429, doubled on every further 429
    pub rate_limit_delay_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.inaturalist.org/v1".to_string(),
            cache_path: None,
            cache_ttl_days: 14,
            max_calls: 60,
            interval_secs: 60,
            rate_limit_delay_secs: 60,
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Cache time-to-live as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_days.saturating_mul(24 * 3600))
    }
}

/// Common-name settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamesConfig {
    /// Language tag for common names (e.g. "en", "de_CH").
    /// Detected from the environment when unset.
    pub language: Option<String>,

    /// Attach every matching common name, joined with "; "
    pub all_common_names: bool,

    /// Skip common names entirely
    pub scientific_names_only: bool,
}

/// Prediction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Number of labels reported in label-only mode (1-100)
    pub result_size: usize,

    /// Report raw label probabilities instead of a taxonomic path
    pub label_probabilities_only: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            result_size: 5,
            label_probabilities_only: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
