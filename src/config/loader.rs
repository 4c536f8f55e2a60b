//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (DOORKEEPER_*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::{AppConfig, StorageBackend};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "doorkeeper.toml",
    ".doorkeeper.toml",
    "~/.config/doorkeeper/config.toml",
    "/etc/doorkeeper/config.toml",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with DOORKEEPER_ prefix
    // e.g., DOORKEEPER_STORAGE__PATH, DOORKEEPER_DETECTION__RESOLUTION_WINDOW_SECS
    // Double underscore (__) maps to nested keys (storage.path)
    builder = builder.add_source(
        Environment::with_prefix("DOORKEEPER")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.storage.backend == StorageBackend::File && config.storage.path.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "storage.path (required for the file backend)".to_string(),
        });
    }

    if config.detection.resolution_window_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "detection.resolution_window_secs must be greater than 0".to_string(),
        });
    }

    if config.detection.resolution_window().is_none() {
        return Err(ConfigError::Invalid {
            message: "detection.resolution_window_secs is too large".to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Invalid {
            message: format!(
                "logging.level must be one of {}, got: {}",
                LOG_LEVELS.join(", "),
                config.logging.level
            ),
        });
    }

    Ok(())
}
