//! Loading and saving `config.ini`.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::parser::parse_ini;
use super::settings::ConfigFile;

/// Errors that can occur while loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("cache"))
            .set("max_age_ms", self.cache.max_age_ms.to_string())
            .set("deflate_upstream", self.cache.deflate_upstream.to_string());
        if let Some(ms) = self.cache.reap_interval_ms {
            ini.with_section(Some("cache"))
                .set("reap_interval_ms", ms.to_string());
        }

        if let Some(uri) = &self.source.uri {
            ini.with_section(Some("source")).set("uri", uri.as_str());
        }
        ini.with_section(Some("source"))
            .set("scale", self.source.scale.to_string());

        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.to_string_lossy())
            .set("file", self.logging.file.as_str());

        ini
    }
}

/// Directory holding the config file (`<config dir>/tilebackend`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilebackend")
}

/// Default config file path.
pub fn default_config_path() -> PathBuf {
    config_directory().join("config.ini")
}
