//! Configuration file parser for `config.toml` in the platform config directory.
//!
//! The config file is optional; a missing or empty file yields
//! `Config::default()`. Command-line flags override whatever is set here.

use crate::watched::DEFAULT_STORAGE_KEY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level application configuration.
///
/// Any subset of keys can be specified; missing keys use the defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for persisted state. Defaults to the platform data directory.
    pub storage_dir: Option<PathBuf>,

    /// Key the watched set is stored under.
    pub storage_key: String,

    /// Bundled catalog JSON file.
    pub catalog_path: Option<PathBuf>,

    /// Media lookup table JSON file.
    pub media_path: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set (e.g. "warn", "episode_shelf=debug").
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            catalog_path: None,
            media_path: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Location of the config file in the platform config directory, if one
    /// can be determined
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "episode-shelf")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), storage_key = %config.storage_key, "Loaded configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temp::create_temp_dir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_key, "watchedEpisodes");
        assert_eq!(config.log_filter, "warn");
        assert!(config.storage_dir.is_none());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let config = Config::load(Path::new("/nonexistent/episode-shelf/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = create_temp_dir("config_empty").unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "  \n").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = create_temp_dir("config_partial").unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "storage_key = \"profile-2\"\ncatalog_path = \"/data/simpsons.json\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage_key, "profile-2");
        assert_eq!(config.catalog_path, Some(PathBuf::from("/data/simpsons.json")));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = create_temp_dir("config_invalid").unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "storage_key = [unterminated").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
