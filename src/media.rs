//! Media lookup module
//!
//! Bundled images are referenced by name in the raw catalog. This module
//! resolves those names into opaque media handles, substituting a fallback
//! handle whenever a name is absent or unknown.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a media table
#[derive(Debug, Error)]
pub enum MediaError {
    /// Failed to read the media table file
    #[error("Failed to read media table {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The media table file is not valid JSON of the expected shape
    #[error("Failed to parse media table {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// An opaque reference to a bundled image resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static image lookup tables for season covers and episode stills
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaTable {
    /// Season image name to handle
    pub seasons: HashMap<String, MediaHandle>,
    /// Episode image name to handle
    pub episodes: HashMap<String, MediaHandle>,
    /// Used for seasons whose image is missing from `seasons`
    pub season_fallback: MediaHandle,
    /// Used for episodes whose image is missing from `episodes`
    pub episode_fallback: MediaHandle,
}

impl Default for MediaTable {
    fn default() -> Self {
        Self {
            seasons: HashMap::new(),
            episodes: HashMap::new(),
            season_fallback: MediaHandle::new("adaptive-icon.png"),
            episode_fallback: MediaHandle::new("icon.png"),
        }
    }
}

impl MediaTable {
    /// Loads a media table from a JSON file
    ///
    /// Keys missing from the file take their default values, so a file
    /// containing only `{"seasons": {...}}` is valid.
    pub fn from_file(path: &Path) -> Result<Self, MediaError> {
        let content = fs::read_to_string(path).map_err(|e| MediaError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| MediaError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolves a season cover name, falling back to the season fallback handle
    pub fn season_image(&self, name: Option<&str>) -> MediaHandle {
        name.and_then(|n| self.seasons.get(n))
            .unwrap_or(&self.season_fallback)
            .clone()
    }

    /// Resolves an episode image name, falling back to the episode fallback handle
    pub fn episode_image(&self, name: Option<&str>) -> MediaHandle {
        name.and_then(|n| self.episodes.get(n))
            .unwrap_or(&self.episode_fallback)
            .clone()
    }
}
