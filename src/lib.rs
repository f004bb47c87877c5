//! Episode Shelf - browse a bundled catalog of TV seasons and episodes
//!
//! This library provides the core of the season shelf screen: normalizing the
//! bundled catalog into a render-ready shape, and tracking which episodes
//! have been watched across sessions.

mod catalog;
mod config;
mod media;
mod shelf;
mod storage;
mod temp;
mod watched;

use std::sync::Arc;

// Re-export error types
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use media::MediaError;
pub use shelf::ShelfError;
pub use storage::StorageError;

pub use catalog::{
    Catalog, DEFAULT_AVG_COLOR, Episode, NO_SYNOPSIS, RawCatalog, RawEpisode, RawScalar,
    RawSeason, Season, UNKNOWN, UNTITLED, normalize,
};
pub use config::Config;
pub use media::{MediaHandle, MediaTable};
pub use shelf::Shelf;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use watched::{DEFAULT_STORAGE_KEY, WatchedSet, WatchedStore, composite_key};

use thiserror::Error;

/// Top-level error type for Episode Shelf operations
#[derive(Debug, Error)]
pub enum EpisodeShelfError {
    /// Error while reading the catalog bundle
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error while loading the media table
    #[error("Media table error: {0}")]
    Media(#[from] MediaError),

    /// Error while loading configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while acting on the shelf
    #[error("{0}")]
    Shelf(#[from] ShelfError),
}

/// Opens the persistence backend described by the configuration
///
/// Falls back to an in-memory store if the directory cannot be opened, so
/// the shelf stays usable without persistence.
pub fn open_backend(config: &Config) -> Arc<dyn KeyValueStore> {
    let opened = match &config.storage_dir {
        Some(dir) => FileStore::open_in(dir),
        None => FileStore::open("state"),
    };

    match opened {
        Ok(store) => {
            tracing::debug!(dir = %store.dir().display(), "Opened storage directory");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Storage unavailable, watched episodes will not be saved");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Builds and mounts a shelf from the configuration
///
/// Reads the catalog bundle and media table named in `config`, normalizes the
/// catalog and loads the watched set. Without a catalog path the shelf is
/// empty.
///
/// # Examples
///
/// ```no_run
/// use episode_shelf::{Config, open_shelf};
///
/// # async fn run() -> Result<(), episode_shelf::EpisodeShelfError> {
/// let config = Config {
///     catalog_path: Some("simpsons.json".into()),
///     ..Config::default()
/// };
/// let mut shelf = open_shelf(&config).await?;
///
/// for season in &shelf.catalog().seasons {
///     println!("{} ({} episodes)", season.title, season.episodes.len());
/// }
///
/// shelf.toggle("1", "0")?;
/// shelf.flush().await;
/// # Ok(())
/// # }
/// ```
pub async fn open_shelf(config: &Config) -> Result<Shelf, EpisodeShelfError> {
    let raw = match &config.catalog_path {
        Some(path) => RawCatalog::from_file(path)?,
        None => {
            tracing::warn!("No catalog bundle configured, the shelf is empty");
            RawCatalog::default()
        }
    };

    let media = match &config.media_path {
        Some(path) => MediaTable::from_file(path)?,
        None => MediaTable::default(),
    };

    let catalog = normalize(Some(&raw), &media);
    let store = WatchedStore::with_key(open_backend(config), config.storage_key.clone());

    Ok(Shelf::mount(catalog, store).await)
}
