//! # Blob Storage
//!
//! The recorder and POI store persist through a small key/blob port so the
//! core never touches a concrete storage backend directly.
//!
//! Two stores are built in:
//! - [`MemoryStore`] - a mutex-guarded map, for tests and throwaway sessions
//! - [`FileStore`] - one JSON file per key inside a directory
//!
//! A SQLite store is available behind the `persistence` feature.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;
use serde::de::DeserializeOwned;

use crate::{BacktrackError, Result};

/// Key/blob persistence port.
///
/// Deleting an absent key is not an error.
pub trait BlobStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// A store shared between the path recorder and the POI store.
pub type SharedStore = Arc<dyn BlobStore>;

/// Read and decode the JSON blob under `key`.
///
/// Undecodable bytes are reported as [`BacktrackError::PersistenceCorrupt`].
pub fn load_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> Result<Option<T>> {
    let Some(bytes) = store.read(key)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| BacktrackError::PersistenceCorrupt {
            key: key.to_string(),
            message: e.to_string(),
        })
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs.lock().map_err(|_| BacktrackError::Storage {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// Directory-backed blob store: key `k` lives in `<dir>/k.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("[FileStore] Opened {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        assert_eq!(store.read("k").unwrap(), None);

        store.write("k", b"[1,2]").unwrap();
        assert_eq!(store.read("k").unwrap(), Some(b"[1,2]".to_vec()));

        store.write("k", b"[]").unwrap();
        assert_eq!(store.read("k").unwrap(), Some(b"[]".to_vec()));

        store.delete("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);

        // Deleting again is fine
        store.delete("k").unwrap();
    }

    #[test]
    fn test_load_json() {
        let store = MemoryStore::new();
        assert_eq!(load_json::<Vec<u32>>(&store, "k").unwrap(), None);

        store.write("k", b"[1,2]").unwrap();
        assert_eq!(load_json::<Vec<u32>>(&store, "k").unwrap(), Some(vec![1, 2]));

        store.write("k", b"[1,").unwrap();
        let err = load_json::<Vec<u32>>(&store, "k").unwrap_err();
        assert!(matches!(err, BacktrackError::PersistenceCorrupt { ref key, .. } if key == "k"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_file_store_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("a", b"1").unwrap();
        store.write("b", b"2").unwrap();
        store.delete("a").unwrap();
        assert_eq!(store.read("a").unwrap(), None);
        assert_eq!(store.read("b").unwrap(), Some(b"2".to_vec()));
    }
}
