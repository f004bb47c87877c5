//! The season shelf screen state
//!
//! Ties the normalized catalog to the watched-state store: the watched set is
//! loaded once when the shelf is mounted, and every toggle replaces it with
//! the updated set while a write runs in the background.

use crate::catalog::{Catalog, Episode, Season};
use crate::watched::{WatchedSet, WatchedStore};
use thiserror::Error;

/// Errors that can occur when acting on the shelf
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShelfError {
    /// No season with this id exists in the catalog
    #[error("Unknown season: {0}")]
    UnknownSeason(String),

    /// The season exists but has no episode with this id
    #[error("Unknown episode {episode_id} in season {season_id}")]
    UnknownEpisode {
        season_id: String,
        episode_id: String,
    },
}

/// A mounted shelf: the catalog plus the current watched set
pub struct Shelf {
    catalog: Catalog,
    store: WatchedStore,
    watched: WatchedSet,
}

impl Shelf {
    /// Mounts the shelf, loading the persisted watched set
    pub async fn mount(catalog: Catalog, store: WatchedStore) -> Self {
        let duplicates = catalog.duplicate_ids();
        if !duplicates.is_empty() {
            tracing::warn!(?duplicates, "Catalog contains duplicate ids, watched flags will be shared");
        }

        let watched = store.load().await;
        tracing::info!(
            seasons = catalog.seasons.len(),
            episodes = catalog.episode_count(),
            watched = watched.len(),
            "Mounted shelf"
        );

        Self {
            catalog,
            store,
            watched,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn watched(&self) -> &WatchedSet {
        &self.watched
    }

    pub fn is_watched(&self, season_id: &str, episode_id: &str) -> bool {
        self.watched.is_watched(season_id, episode_id)
    }

    /// Looks up a season and one of its episodes
    pub fn episode(&self, season_id: &str, episode_id: &str) -> Result<(&Season, &Episode), ShelfError> {
        let season = self
            .catalog
            .season(season_id)
            .ok_or_else(|| ShelfError::UnknownSeason(season_id.to_string()))?;

        let episode = season
            .episode(episode_id)
            .ok_or_else(|| ShelfError::UnknownEpisode {
                season_id: season_id.to_string(),
                episode_id: episode_id.to_string(),
            })?;

        Ok((season, episode))
    }

    /// Flips the watched flag of an episode in the catalog
    ///
    /// Returns the new flag. Persistence happens in the background; see
    /// [`Shelf::flush`].
    pub fn toggle(&mut self, season_id: &str, episode_id: &str) -> Result<bool, ShelfError> {
        self.episode(season_id, episode_id)?;

        self.watched = self.store.toggle(&self.watched, season_id, episode_id);
        Ok(self.watched.is_watched(season_id, episode_id))
    }

    /// Waits for pending writes to finish
    pub async fn flush(&self) {
        self.store.flush().await;
    }
}
