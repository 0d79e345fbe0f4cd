//! Configuration module

use crate::codec::{DEFAULT_LEVEL, DEFAULT_WORKERS};
use crate::{Error, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default compression settings
    pub compression: CompressionConfig,
}

/// Compression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// zstd compression level
    pub level: i32,
    /// Number of encoder worker threads
    pub workers: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Path of the configuration file, if a config directory exists
    pub fn path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("bale").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {:?}: {}", path, err)))?;
        toml::from_str(&raw)
            .map_err(|err| Error::Config(format!("cannot parse {:?}: {}", path, err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.compression.level, DEFAULT_LEVEL);
        assert_eq!(config.compression.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[compression]\nlevel = 9\nworkers = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.compression.level, 9);
        assert_eq!(config.compression.workers, 2);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[compression]\nlevel = 9\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.compression.level, 9);
        assert_eq!(config.compression.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "compression = [[nonsense").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
