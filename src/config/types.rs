//! Configuration types for doorkeeper
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::detection::DEFAULT_RESOLUTION_WINDOW_SECS;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage backend settings
    pub storage: StorageConfig,

    /// Suspicious activity detection settings
    pub detection: DetectionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which store implementation to use
    pub backend: StorageBackend,

    /// Snapshot file (for the file backend)
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "doorkeeper.json".to_string(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Everything is lost when the process exits
    Memory,
    /// JSON snapshot file
    #[default]
    File,
}

/// Suspicious activity detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// How long a failure may wait for a resolving success before it is
    /// considered suspicious
    pub resolution_window_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            resolution_window_secs: DEFAULT_RESOLUTION_WINDOW_SECS,
        }
    }
}

impl DetectionConfig {
    /// The window as a duration, or `None` if it does not fit in one
    pub fn resolution_window(&self) -> Option<Duration> {
        i64::try_from(self.resolution_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, "doorkeeper.json");
        assert_eq!(config.detection.resolution_window_secs, 120);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_resolution_window_bounds() {
        let mut detection = DetectionConfig::default();
        assert_eq!(detection.resolution_window(), Some(Duration::seconds(120)));

        detection.resolution_window_secs = 100_000_000_000_000_000;
        assert_eq!(detection.resolution_window(), None);

        detection.resolution_window_secs = u64::MAX;
        assert_eq!(detection.resolution_window(), None);
    }

    #[test]
    fn test_deserialize_storage_backend() {
        let backend: StorageBackend = serde_json::from_str(r#""memory""#).unwrap();
        assert_eq!(backend, StorageBackend::Memory);

        let backend: StorageBackend = serde_json::from_str(r#""file""#).unwrap();
        assert_eq!(backend, StorageBackend::File);
    }

    #[test]
    fn test_deserialize_log_format() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
