//! Registry configuration
//!
//! Loaded from environment variables with defaults suitable for tests and
//! development.

use std::time::Duration;

use crate::error::{CacheError, CacheResult, ConfigError};

/// Runtime knobs for a cache registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Name attached to every log event emitted by the registry.
    pub label: String,

    /// Convert producer panics into materialization failures.
    /// When false the failure is still recorded, then the panic resumes
    /// in the caller that ran the producer.
    pub catch_panics: bool,

    /// Materializations slower than this are logged as warnings.
    pub slow_producer_threshold: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            catch_panics: true,
            slow_producer_threshold: Duration::from_secs(1),
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create RegistryConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LAZYCACHE_REGISTRY_LABEL`: Label for log events (default: "default")
    /// - `LAZYCACHE_CATCH_PANICS`: "true" or "false" (default: true)
    /// - `LAZYCACHE_SLOW_PRODUCER_MS`: Slow materialization threshold (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let label = std::env::var("LAZYCACHE_REGISTRY_LABEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.label);

        let catch_panics = std::env::var("LAZYCACHE_CATCH_PANICS")
            .ok()
            .map(|s| s.to_lowercase() != "false" && s != "0")
            .unwrap_or(defaults.catch_panics);

        let slow_producer_threshold = std::env::var("LAZYCACHE_SLOW_PRODUCER_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.slow_producer_threshold);

        Self {
            label,
            catch_panics,
            slow_producer_threshold,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    pub fn with_slow_producer_threshold(mut self, threshold: Duration) -> Self {
        self.slow_producer_threshold = threshold;
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - label is not blank
    /// - slow_producer_threshold is positive
    pub fn validate(&self) -> CacheResult<()> {
        if self.label.trim().is_empty() {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "label".to_string(),
                value: format!("{:?}", self.label),
                reason: "label must not be blank".to_string(),
            }));
        }

        if self.slow_producer_threshold.is_zero() {
            return Err(CacheError::Config(ConfigError::InvalidValue {
                field: "slow_producer_threshold".to_string(),
                value: format!("{:?}", self.slow_producer_threshold),
                reason: "slow_producer_threshold must be positive".to_string(),
            }));
        }

        Ok(())
    }
}
