//! Temporary path management module
//!
//! This module provides RAII-based cleanup for scratch files written next to
//! their final destination, and for throwaway directories in tests.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for temporary resources that automatically cleans up on drop
#[derive(Debug)]
pub(crate) enum TempGuard {
    /// Temporary file that will be deleted when dropped
    File(PathBuf),
    /// Temporary directory that will be deleted recursively when dropped
    #[cfg_attr(not(test), allow(dead_code))]
    Directory(PathBuf),
}

impl TempGuard {
    /// Get the path to the temporary resource
    pub(crate) fn path(&self) -> &Path {
        match self {
            TempGuard::File(path) | TempGuard::Directory(path) => path,
        }
    }

    /// Disarms the guard and hands back the path; nothing is removed on drop
    pub(crate) fn release(mut self) -> PathBuf {
        match &mut self {
            TempGuard::File(path) | TempGuard::Directory(path) => std::mem::take(path),
        }
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        // Released guards hold an empty path.
        if self.path().as_os_str().is_empty() {
            return;
        }

        // Silently ignore errors during cleanup
        match self {
            TempGuard::File(path) => {
                let _ = fs::remove_file(path);
            }
            TempGuard::Directory(path) => {
                let _ = fs::remove_dir_all(path);
            }
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Reserves a unique scratch file path inside `dir`
///
/// The file itself is not created; the caller writes it. The name is made
/// unique with a ULID so concurrent writers never share a scratch file.
pub(crate) fn scratch_file_in(dir: &Path, prefix: &str) -> TempGuard {
    let ulid = ulid::Ulid::new();
    TempGuard::File(dir.join(format!(".{}_{}.tmp", prefix, ulid)))
}

/// Creates a fresh directory under the system temp directory
#[cfg(test)]
pub(crate) fn create_temp_dir(prefix: &str) -> std::io::Result<TempGuard> {
    let path = std::env::temp_dir().join(format!("{}_{}", prefix, ulid::Ulid::new()));
    fs::create_dir_all(&path)?;
    Ok(TempGuard::Directory(path))
}
