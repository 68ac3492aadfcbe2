//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Largest accepted `prediction.result_size`.
const MAX_RESULT_SIZE: usize = 100;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api.max_calls == 0 {
            return Err(ConfigError::ValidationError(
                "api.max_calls must be > 0".into(),
            ));
        }
        if self.api.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.interval_secs must be > 0".into(),
            ));
        }
        if self.api.cache_ttl_days == 0 {
            return Err(ConfigError::ValidationError(
                "api.cache_ttl_days must be > 0".into(),
            ));
        }
        if self.api.rate_limit_delay_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.rate_limit_delay_secs must be > 0".into(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".into(),
            ));
        }
        if self.prediction.result_size == 0 || self.prediction.result_size > MAX_RESULT_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "prediction.result_size must be between 1 and {MAX_RESULT_SIZE}"
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
