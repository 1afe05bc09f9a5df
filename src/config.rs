//! User configuration and preferences

use crate::domain::KeyBindMap;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UserConfig {
    /// Whether folders are prefetched in the background
    pub cache_images: bool,
    /// Key to destination folder associations
    pub keybinds: KeyBindMap,
    /// Folder opened in the previous session
    pub last_folder: Option<PathBuf>,
}

impl UserConfig {
    /// Get the config file path (~/.config/picsort/config.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("picsort").join("config.json"))
    }

    /// Where the binary writes its log (~/.cache/picsort/picsort.log)
    pub fn log_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("picsort").join("picsort.log"))
    }

    /// Load config from file, or create default if doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&contents)?;
        config.keybinds.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(io_err)?;

        Ok(())
    }
}
