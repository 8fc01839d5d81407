//! Thumbnail pipeline configuration.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Default bound for the reclaimable thumbnail cache tier.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 256;

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serializing the configuration failed.
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    /// The configuration file is not valid TOML.
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

/// Configuration for the thumbnail pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Maximum number of entries in the reclaimable cache tier.
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,
}

fn default_cache_max_size() -> usize {
    DEFAULT_CACHE_MAX_SIZE
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_max_size: default_cache_max_size(),
        }
    }
}

impl ThumbnailConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// Returns `ConfigError` if the text is not valid TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file is replaced with a freshly written default
    /// configuration; a malformed file is left untouched and defaults
    /// are used for the session.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, or if the
    /// default configuration cannot be written out.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {:?}, creating default.", path);
            let default_config = Self::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)?;
        match Self::parse(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                Ok(Self::default())
            }
        }
    }

    /// Saves the configuration to `path`, replacing it atomically.
    ///
    /// # Errors
    /// Returns `ConfigError` if serialization or the file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other("Invalid path"))?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(path).map_err(|e| e.error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_cache_size() {
        let config = ThumbnailConfig::default();
        assert_eq!(config.cache_max_size, 256);
    }

    #[test]
    fn test_parse_reads_cache_size() {
        let config = ThumbnailConfig::parse("cache_max_size = 64").unwrap();
        assert_eq!(config.cache_max_size, 64);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = ThumbnailConfig::parse("").unwrap();
        assert_eq!(config.cache_max_size, DEFAULT_CACHE_MAX_SIZE);
    }

    #[test]
    fn test_parse_rejects_invalid_toml() {
        let result = ThumbnailConfig::parse("cache_max_size = [");
        assert!(matches!(result, Err(ConfigError::TomlDe(_))));
    }

    #[test]
    fn test_load_creates_default_if_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thumbnails.toml");

        let config = ThumbnailConfig::load(&path).unwrap();
        assert_eq!(config, ThumbnailConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_handles_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thumbnails.toml");
        fs::write(&path, "cache_max_size = [").unwrap();

        let config = ThumbnailConfig::load(&path).unwrap();
        assert_eq!(config, ThumbnailConfig::default());

        // The broken file is preserved for inspection.
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "cache_max_size = [");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("thumbnails.toml");

        let config = ThumbnailConfig { cache_max_size: 32 };
        config.save(&path).unwrap();
        assert!(path.exists());

        let loaded = ThumbnailConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
