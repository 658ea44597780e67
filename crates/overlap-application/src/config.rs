//! Synchronization configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use overlap_core::error::{OverlapError, Result};

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_backoff_base_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_event_capacity() -> usize {
    64
}

/// Tuning knobs for the synchronization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between observation polls of a remote session.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Initial backoff after a transient observation failure, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Backoff ceiling, in seconds. Backoff doubles up to this value.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Capacity of the session event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SyncConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| OverlapError::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        })
    }

    /// Loads a configuration file, falling back to defaults when missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = SyncConfig::from_toml_str("poll_interval_secs = 10").unwrap();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.backoff_base_secs, 1);
        assert_eq!(config.backoff_max_secs, 60);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn malformed_toml_is_a_serialization_error() {
        let err = SyncConfig::from_toml_str("poll_interval_secs = [").unwrap_err();
        assert!(matches!(err, OverlapError::Serialization { .. }));
    }
}
