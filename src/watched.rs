//! Watched-state tracking module
//!
//! Tracks which episodes the user has marked as watched. The set itself is a
//! plain owned value: every toggle returns a new [`WatchedSet`] and leaves the
//! old one untouched. [`WatchedStore`] mirrors each new set to a
//! [`KeyValueStore`] under a single fixed key.
//!
//! Writes are detached tasks. They are never retried, never cancelled and
//! never awaited by `toggle`; their failures only reach the log. When two
//! writes overlap, whichever finishes last determines the stored copy.

use crate::catalog::Season;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Storage key the watched set is persisted under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "watchedEpisodes";

/// Builds the lookup key for a (season, episode) pair
pub fn composite_key(season_id: &str, episode_id: &str) -> String {
    format!("{}_{}", season_id, episode_id)
}

/// The set of watched episodes, keyed by [`composite_key`]
///
/// Stored `false` entries are kept so the persisted shape round-trips, but
/// they compare equal to absent entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchedSet(BTreeMap<String, bool>);

impl WatchedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the persisted JSON object form
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes into the persisted JSON object form
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_watched(&self, season_id: &str, episode_id: &str) -> bool {
        self.0
            .get(&composite_key(season_id, episode_id))
            .copied()
            .unwrap_or(false)
    }

    /// Returns a copy with the pair's watched flag flipped
    pub fn toggled(&self, season_id: &str, episode_id: &str) -> Self {
        let watched = self.is_watched(season_id, episode_id);
        let mut next = self.clone();
        next.0.insert(composite_key(season_id, episode_id), !watched);
        next
    }

    /// Number of watched episodes across all seasons
    pub fn len(&self) -> usize {
        self.0.values().filter(|watched| **watched).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of the season's episodes that are watched
    pub fn watched_in_season(&self, season: &Season) -> usize {
        season
            .episodes
            .iter()
            .filter(|episode| self.is_watched(&season.id, &episode.id))
            .count()
    }

    fn watched_keys(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, watched)| **watched)
            .map(|(key, _)| key.as_str())
    }
}

impl PartialEq for WatchedSet {
    fn eq(&self, other: &Self) -> bool {
        self.watched_keys().eq(other.watched_keys())
    }
}

impl Eq for WatchedSet {}

impl<'a> FromIterator<(&'a str, &'a str)> for WatchedSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(season_id, episode_id)| (composite_key(season_id, episode_id), true))
                .collect(),
        )
    }
}

/// Loads and persists the watched set through a key-value store
pub struct WatchedStore {
    /// The persistence backend
    backend: Arc<dyn KeyValueStore>,
    /// The single key the set is stored under
    key: String,
    /// Writes that may still be running
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl WatchedStore {
    /// Creates a store persisting under [`DEFAULT_STORAGE_KEY`]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, DEFAULT_STORAGE_KEY)
    }

    /// Creates a store persisting under a custom key
    pub fn with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The storage key in use
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the persisted set
    ///
    /// Missing data, unreadable storage and corrupt data all produce an empty
    /// set. Failures are logged, never returned.
    pub async fn load(&self) -> WatchedSet {
        let stored = match self.backend.get(&self.key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::debug!(key = %self.key, "No watched episodes stored yet");
                return WatchedSet::new();
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read watched episodes");
                return WatchedSet::new();
            }
        };

        match WatchedSet::from_json(&stored) {
            Ok(set) => {
                tracing::debug!(key = %self.key, watched = set.len(), "Loaded watched episodes");
                set
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Stored watched episodes are corrupt, starting empty");
                WatchedSet::new()
            }
        }
    }

    /// Flips the pair's watched flag and schedules a write of the result
    ///
    /// The new set is serialized before this returns; the write itself runs
    /// in the background on the current Tokio runtime. Without a runtime the
    /// write is skipped and logged, and the returned set is still valid.
    pub fn toggle(&self, state: &WatchedSet, season_id: &str, episode_id: &str) -> WatchedSet {
        let next = state.toggled(season_id, episode_id);
        tracing::debug!(
            season_id,
            episode_id,
            watched = next.is_watched(season_id, episode_id),
            "Toggled watched flag"
        );
        self.schedule_write(&next);
        next
    }

    /// Pure lookup; see [`WatchedSet::is_watched`]
    pub fn is_watched(state: &WatchedSet, season_id: &str, episode_id: &str) -> bool {
        state.is_watched(season_id, episode_id)
    }

    /// Waits until every write scheduled so far has finished
    ///
    /// This never cancels anything. Writes scheduled while flushing are not
    /// waited for.
    pub async fn flush(&self) {
        let handles = std::mem::take(&mut *self.lock_pending());

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(key = %self.key, error = %e, "Watched-state write task failed");
            }
        }
    }

    fn schedule_write(&self, set: &WatchedSet) {
        let snapshot = match set.to_json() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to serialize watched episodes");
                return;
            }
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "No async runtime, watched episodes not persisted");
                return;
            }
        };

        let backend = Arc::clone(&self.backend);
        let key = self.key.clone();
        let handle = runtime.spawn(async move {
            match backend.set(&key, &snapshot).await {
                Ok(()) => tracing::debug!(key = %key, "Persisted watched episodes"),
                Err(e) => tracing::warn!(key = %key, error = %e, "Failed to persist watched episodes"),
            }
        });

        let mut pending = self.lock_pending();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// A backend whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
    }

    /// A backend where the first write is slow and later ones are immediate
    #[derive(Default)]
    struct SlowFirstWriteStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for SlowFirstWriteStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.inner.set(key, value).await
        }
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key("S1", "E2"), "S1_E2");
        assert_eq!(composite_key("0", "0"), "0_0");
    }

    #[test]
    fn test_toggle_on_empty_then_back() {
        let empty = WatchedSet::new();
        let once = empty.toggled("0", "0");
        assert_eq!(once.to_json().unwrap(), r#"{"0_0":true}"#);
        assert!(once.is_watched("0", "0"));

        let twice = once.toggled("0", "0");
        assert_eq!(twice.to_json().unwrap(), r#"{"0_0":false}"#);
        assert!(!twice.is_watched("0", "0"));
        assert_eq!(twice, empty);
    }

    #[test]
    fn test_toggle_leaves_original_untouched() {
        let original: WatchedSet = [("1", "1")].into_iter().collect();
        let next = original.toggled("1", "2");

        assert!(!original.is_watched("1", "2"));
        assert!(next.is_watched("1", "1"));
        assert!(next.is_watched("1", "2"));
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_false_entries_equal_absent_entries() {
        let explicit = WatchedSet::from_json(r#"{"1_1": true, "1_2": false}"#).unwrap();
        let implicit = WatchedSet::from_json(r#"{"1_1": true}"#).unwrap();
        assert_eq!(explicit, implicit);
        assert_eq!(explicit.len(), 1);
        assert!(!explicit.is_watched("1", "2"));
    }

    #[test]
    fn test_watched_in_season() {
        let raw = crate::catalog::RawCatalog::from_json(
            r#"{"seasons": [{"id": "s", "episodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}]}"#,
        );
        let catalog = crate::catalog::normalize(Some(&raw), &crate::media::MediaTable::default());
        let set: WatchedSet = [("s", "a"), ("s", "c"), ("t", "b")].into_iter().collect();

        assert_eq!(set.watched_in_season(&catalog.seasons[0]), 2);
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let store = WatchedStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_previously_persisted_set() {
        let backend = MemoryStore::with_value(DEFAULT_STORAGE_KEY, r#"{"S1_E2": true}"#);
        let store = WatchedStore::new(Arc::new(backend));
        let state = store.load().await;

        assert!(WatchedStore::is_watched(&state, "S1", "E2"));
        assert!(!WatchedStore::is_watched(&state, "S1", "E1"));
        assert!(!WatchedStore::is_watched(&state, "S2", "E2"));
    }

    #[tokio::test]
    async fn test_load_corrupt_data_is_empty() {
        for corrupt in ["not json", "[1, 2]", r#"{"1_1": "yes"}"#, ""] {
            let backend = MemoryStore::with_value(DEFAULT_STORAGE_KEY, corrupt);
            let store = WatchedStore::new(Arc::new(backend));
            assert!(store.load().await.is_empty(), "input: {corrupt:?}");
        }
    }

    #[tokio::test]
    async fn test_load_from_unavailable_backend_is_empty() {
        let store = WatchedStore::new(Arc::new(BrokenStore));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_persists_after_flush() {
        let backend = Arc::new(MemoryStore::new());
        let store = WatchedStore::new(backend.clone());

        let state = store.toggle(&WatchedSet::new(), "1", "3");
        store.flush().await;

        assert_eq!(
            backend.get(DEFAULT_STORAGE_KEY).await.unwrap().as_deref(),
            Some(r#"{"1_3":true}"#)
        );
        assert_eq!(store.load().await, state);
    }

    #[tokio::test]
    async fn test_custom_key_is_used() {
        let backend = Arc::new(MemoryStore::new());
        let store = WatchedStore::with_key(backend.clone(), "profile-2");

        store.toggle(&WatchedSet::new(), "1", "1");
        store.flush().await;

        assert!(backend.get("profile-2").await.unwrap().is_some());
        assert!(backend.get(DEFAULT_STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_in_memory_state() {
        let store = WatchedStore::new(Arc::new(BrokenStore));

        let state = store.toggle(&WatchedSet::new(), "1", "1");
        store.flush().await;

        assert!(state.is_watched("1", "1"));
    }

    #[test]
    fn test_toggle_without_runtime_still_updates() {
        let store = WatchedStore::new(Arc::new(MemoryStore::new()));
        let state = store.toggle(&WatchedSet::new(), "1", "1");
        assert!(state.is_watched("1", "1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_writes_last_finished_wins() {
        let backend = Arc::new(SlowFirstWriteStore::default());
        let store = WatchedStore::new(backend.clone());

        let first = store.toggle(&WatchedSet::new(), "1", "1");
        let _second = store.toggle(&first, "1", "2");
        store.flush().await;

        // The first write was issued earlier but finished later.
        let persisted = backend.get(DEFAULT_STORAGE_KEY).await.unwrap();
        assert_eq!(persisted.as_deref(), Some(r#"{"1_1":true}"#));
    }
}
