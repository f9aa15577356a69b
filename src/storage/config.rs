//! JSON Configuration Management
//!
//! Handles reading and writing the assistant's config.json. A missing file is
//! created with defaults; a present file must validate.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load the config from the per-user default location
    pub fn new() -> AppResult<Self> {
        Self::open(config_path()?)
    }

    /// Load the config at `path`, creating it with defaults when absent
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        let config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading configuration");
            Self::load_from_file(&config_path)?
        } else {
            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            let default_config = AppConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            info!(path = %config_path.display(), "Created default configuration");
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Update the configuration with a partial update
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut next = self.config.clone();
        next.apply_update(update);
        Self::save_to_file(&self.config_path, &next)?;
        self.config = next;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = AppConfig::default();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::locale::Locale;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config_file(content: &str) -> (NamedTempFile, PathBuf) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let path = file.path().to_path_buf();
        (file, path)
    }

    #[test]
    fn test_open_creates_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let service = ConfigService::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(service.get_config().orchestrator.max_rounds, 5);
    }

    #[test]
    fn test_load_partial_file() {
        let (_file, path) = create_test_config_file(r#"{"approval": {"require_confirmation": true}}"#);
        let service = ConfigService::open(&path).unwrap();
        assert!(service.get_config().approval.require_confirmation);
        assert_eq!(service.get_config().guard.per_hour, 300);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let (_file, path) = create_test_config_file(r#"{"orchestrator": {"max_rounds": 0}}"#);
        let err = ConfigService::open(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_config_update_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut service = ConfigService::open(&path).unwrap();

        let updated = service
            .update_config(SettingsUpdate {
                locale: Some(Locale::Es),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.orchestrator.locale, Locale::Es);

        service.reset().unwrap();
        service.reload().unwrap();
        assert_eq!(service.get_config().orchestrator.locale, Locale::En);
    }

    #[test]
    fn test_invalid_update_keeps_previous_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut service = ConfigService::open(&path).unwrap();

        let result = service.update_config(SettingsUpdate {
            max_rounds: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(service.get_config().orchestrator.max_rounds, 5);
    }
}
