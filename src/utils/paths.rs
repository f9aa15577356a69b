//! Cross-Platform Path Utilities
//!
//! Resolves the assistant's configuration directory.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the per-user configuration root (e.g. ~/.config on Linux)
pub fn config_root() -> AppResult<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| AppError::config("Could not determine configuration directory"))
}

/// Get the Tracker Assistant directory (<config>/tracker-assistant/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(config_root()?.join("tracker-assistant"))
}

/// Get the config file path (<config>/tracker-assistant/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
