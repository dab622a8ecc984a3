//! Configuration file handling for `config.ini`.
//!
//! Settings live in [`super::settings`], constants in [`super::defaults`]
//! and INI key mapping in [`super::parser`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::defaults::CONFIG_FILE_NAME;
use super::settings::CacheConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub(super) fn invalid(
        section: &str,
        key: &str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Default config file location: `<config dir>/slippycache/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slippycache")
        .join(CONFIG_FILE_NAME)
}

impl CacheConfig {
    /// Load configuration from the default path.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig::load_from(&temp.path().join("missing.ini")).unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[cache]\nmax_size = 1GB\n\n[download]\nmax_concurrent = 3\n",
        )
        .unwrap();

        let config = CacheConfig::load_from(&path).unwrap();
        assert_eq!(config.max_size_mb, 1024);
        assert_eq!(config.max_concurrent_downloads, 3);
    }

    #[test]
    fn test_config_file_path_name() {
        assert!(config_file_path().ends_with("slippycache/config.ini"));
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid("download", "max_concurrent", "abc", "expected a number");
        let msg = err.to_string();
        assert!(msg.contains("download.max_concurrent"));
        assert!(msg.contains("abc"));
    }
}
