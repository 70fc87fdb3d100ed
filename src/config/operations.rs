//! Config loading, validation, and duration accessors.

use super::model::Config;
use super::types::MIN_TTL_HEARTBEATS;
use crate::error::{LeaseError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LeaseError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LeaseError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config if the file exists, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LeaseError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LeaseError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - every interval and the TTL must be positive
    /// - `lease_ttl_secs` must cover at least two heartbeats
    /// - the summary poll must not run faster than the lock poll
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("lease_ttl_secs", self.lease_ttl_secs),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("lock_poll_interval_secs", self.lock_poll_interval_secs),
            ("summary_poll_interval_secs", self.summary_poll_interval_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(LeaseError::UserError(format!(
                    "config validation failed: {} must be greater than 0",
                    name
                )));
            }
        }

        if self.lease_ttl_secs < self.heartbeat_interval_secs * MIN_TTL_HEARTBEATS {
            return Err(LeaseError::UserError(format!(
                "config validation failed: lease_ttl_secs ({}) must be at least {} x heartbeat_interval_secs ({})",
                self.lease_ttl_secs, MIN_TTL_HEARTBEATS, self.heartbeat_interval_secs
            )));
        }

        if self.summary_poll_interval_secs < self.lock_poll_interval_secs {
            return Err(LeaseError::UserError(format!(
                "config validation failed: summary_poll_interval_secs ({}) must not be shorter than lock_poll_interval_secs ({})",
                self.summary_poll_interval_secs, self.lock_poll_interval_secs
            )));
        }

        Ok(())
    }

    pub fn lease_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lease_ttl_secs as i64)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_secs(self.lock_poll_interval_secs)
    }

    pub fn summary_poll_interval(&self) -> Duration {
        Duration::from_secs(self.summary_poll_interval_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn unload_release_timeout(&self) -> Duration {
        Duration::from_millis(self.unload_release_timeout_ms)
    }
}
