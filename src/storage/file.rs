//! File-backed key-value store
//!
//! Values are kept as JSON text files, one per key, in the system's standard
//! data directory or in a directory supplied by the caller.

use super::{KeyValueStore, StorageError};
use crate::temp::scratch_file_in;
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A key-value store persisting each key as `<key>.json` in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    /// The directory where values are stored
    dir: PathBuf,
}

impl FileStore {
    /// Opens or creates the store in the platform data directory
    ///
    /// The store lives under a subdirectory named after the application and
    /// the provided name. The name will be sanitized (lowercased,
    /// non-alphanumeric characters replaced with underscores).
    pub fn open(name: &str) -> Result<Self, StorageError> {
        let proj_dirs = directories::ProjectDirs::from("", "", "episode-shelf")
            .ok_or(StorageError::DataDirectoryNotFound)?;

        Self::open_in(&proj_dirs.data_dir().join(sanitize_name(name)))
    }

    /// Opens or creates the store in an explicit directory
    pub fn open_in(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Returns the path to the storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed { path, source: e }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);

        // Write next to the target and rename over it, so readers only ever
        // see a complete value. The guard only cleans up if this future is
        // dropped mid-write; otherwise cleanup stays on the async path.
        let scratch = scratch_file_in(&self.dir, &sanitize_name(key));
        let result = write_then_rename(scratch.path(), &path, value).await;

        let scratch = scratch.release();
        if result.is_err() {
            let _ = tokio::fs::remove_file(&scratch).await;
        }
        result?;

        tracing::trace!(path = %path.display(), bytes = value.len(), "Stored value");
        Ok(())
    }
}

async fn write_then_rename(scratch: &Path, path: &Path, value: &str) -> Result<(), StorageError> {
    tokio::fs::write(scratch, value)
        .await
        .map_err(|e| StorageError::WriteFailed {
            path: scratch.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(scratch, path)
        .await
        .map_err(|e| StorageError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temp::create_temp_dir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("watchedEpisodes"), "watchedepisodes");
        assert_eq!(sanitize_name("With Spaces"), "with_spaces");
        assert_eq!(sanitize_name("With-Hyphens"), "with-hyphens");
        assert_eq!(sanitize_name("../escape"), "___escape");
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let dir = create_temp_dir("file_store_missing").unwrap();
        let store = FileStore::open_in(&dir).unwrap();

        assert_eq!(store.get("watchedEpisodes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = create_temp_dir("file_store_roundtrip").unwrap();
        let store = FileStore::open_in(&dir).unwrap();

        store.set("watchedEpisodes", r#"{"1_2":true}"#).await.unwrap();
        store.set("watchedEpisodes", r#"{"1_3":true}"#).await.unwrap();

        assert_eq!(
            store.get("watchedEpisodes").await.unwrap().as_deref(),
            Some(r#"{"1_3":true}"#)
        );
        assert!(dir.join("watchedepisodes.json").is_file());
    }

    #[tokio::test]
    async fn test_set_leaves_no_scratch_files() {
        let dir = create_temp_dir("file_store_scratch").unwrap();
        let store = FileStore::open_in(&dir).unwrap();

        store.set("key", "value").await.unwrap();

        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["key.json".to_string()]);
    }

    #[tokio::test]
    async fn test_set_into_removed_directory_fails() {
        let dir = create_temp_dir("file_store_removed").unwrap();
        let store = FileStore::open_in(&dir.join("nested")).unwrap();
        fs::remove_dir_all(store.dir()).unwrap();

        let result = store.set("key", "value").await;
        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
    }

    #[tokio::test]
    async fn test_failed_rename_removes_scratch_file() {
        let dir = create_temp_dir("file_store_rename").unwrap();
        let store = FileStore::open_in(&dir).unwrap();
        // A directory in the way makes the final rename fail.
        fs::create_dir(dir.join("key.json")).unwrap();

        let result = store.set("key", "value").await;
        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));

        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["key.json".to_string()]);
    }
}
