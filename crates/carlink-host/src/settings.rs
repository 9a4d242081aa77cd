//! TOML settings loading for the host binary.
//!
//! The settings file maps straight onto [`DongleConfig`]; every field is
//! optional and falls back to its default, so a missing or empty file yields
//! a working configuration.  Example:
//!
//! ```toml
//! width = 1280
//! height = 720
//! box_name = "my-car"
//! wifi_type = "5ghz"
//! mic_type = "os"
//!
//! [phone_config.CarPlay]
//! frame_interval = 5000
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use carlink_core::DongleConfig;

/// Default settings path, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "carlink.toml";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads settings from `path`.  A missing file is not an error; it yields
/// the default configuration.
pub fn load_settings(path: &Path) -> Result<DongleConfig, SettingsError> {
    if !path.exists() {
        info!(path = %path.display(), "no settings file, using defaults");
        return Ok(DongleConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&text)?;
    info!(path = %path.display(), "settings loaded");
    Ok(config)
}
