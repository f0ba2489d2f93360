//! Config file loader.

use crate::config::BuildConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the global config path: ~/.config/gokr-build-kernel/config.json
pub fn get_global_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(".config/gokr-build-kernel").join("config.json"))
}

/// Load config from JSON file.
///
/// Fields missing from the file keep their pinned defaults.
pub fn load_config_from_file(path: &Path) -> Result<BuildConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: BuildConfig = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;

    Ok(config)
}

/// Resolve the configuration for a run.
///
/// An explicit path must exist. Without one, the global config is used when
/// present, otherwise the built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<BuildConfig, ConfigError> {
    let config = match explicit {
        Some(path) => {
            log::info!("[Config] Loading configuration from {}", path.display());
            load_config_from_file(path)?
        }
        None => match get_global_config_path() {
            Ok(global) if global.exists() => {
                log::info!("[Config] Loading configuration from {}", global.display());
                load_config_from_file(&global)?
            }
            _ => {
                log::debug!("[Config] No configuration file, using pinned defaults");
                BuildConfig::default()
            }
        },
    };

    config.validate()?;
    Ok(config)
}

/// Validate config path (.json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json extension".to_string(),
        )),
    }
}
