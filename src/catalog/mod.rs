//! Data structures for the bundled season and episode catalog.
//!
//! This module provides the render-ready representation of seasons and
//! episodes, the raw bundle shapes they are built from, and the normalizer
//! that turns one into the other.
mod normalize;
mod raw;

pub use normalize::{DEFAULT_AVG_COLOR, NO_SYNOPSIS, UNKNOWN, UNTITLED, normalize};
pub use raw::{RawCatalog, RawEpisode, RawScalar, RawSeason};

use crate::media::MediaHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the catalog bundle.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the bundle file
    #[error("Failed to read catalog bundle {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A single episode, fully defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Unique within the parent season
    pub id: String,
    /// The episode number within the season (1-based)
    pub episode_number: u32,
    /// The episode title
    pub title: String,
    /// Running time in minutes, free text
    pub duration: String,
    /// A brief description of the episode
    pub synopsis: String,
    /// Original air date, free text
    pub air_date: String,
    /// Source image name, if the bundle named one
    pub image: Option<String>,
    /// Resolved still image
    pub image_ref: MediaHandle,
}

/// A season with its ordered episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    /// Unique within the catalog
    pub id: String,
    /// The season title
    pub title: String,
    /// Source cover image name, if the bundle named one
    pub image: Option<String>,
    /// Resolved cover image
    pub cover_image_ref: MediaHandle,
    /// Accent colour used behind the cover
    pub avg_color: String,
    /// Episodes in bundle order
    pub episodes: Vec<Episode>,
}

impl Season {
    /// Looks up an episode of this season by id
    pub fn episode(&self, episode_id: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == episode_id)
    }
}

/// The complete, immutable catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Seasons in bundle order
    pub seasons: Vec<Season>,
}

impl Catalog {
    /// Looks up a season by id
    pub fn season(&self, season_id: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == season_id)
    }

    /// Total number of episodes across all seasons
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }

    /// Returns ids that occur more than once, either among seasons or
    /// among the episodes of one season.
    ///
    /// Normalization keeps explicit ids verbatim, so a bundle can mix an
    /// explicit id with a positional default that collides with it.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut duplicates = Vec::new();

        let mut seen = HashSet::new();
        for season in &self.seasons {
            if !seen.insert(season.id.as_str()) {
                duplicates.push(season.id.clone());
            }

            let mut seen_episodes = HashSet::new();
            for episode in &season.episodes {
                if !seen_episodes.insert(episode.id.as_str()) {
                    duplicates.push(format!("{}/{}", season.id, episode.id));
                }
            }
        }

        duplicates
    }
}
