//! File-backed scratch state.
//!
//! Retry state survives restarts through a small JSON key-value file:
//!
//! - `updated/<list>` - last successful poll, recommended wait, and
//!   consecutive failure count
//! - `full_hash_errors/<hexPrefix>` - last failure time and count for
//!   gethash requests
//!
//! Writes go through a temp file and rename so a crash never leaves a
//! torn file. Keys are read and written atomically.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::StoreError;
use shavar_core::{ListName, Prefix};

/// Scratch-state key for a list's update record.
pub fn updated_key(list: &ListName) -> String {
    format!("updated/{list}")
}

/// Scratch-state key for a prefix's gethash error record.
pub fn full_hash_errors_key(prefix: &Prefix) -> String {
    format!("full_hash_errors/{}", prefix.to_hex())
}

/// Persistent key-value scratch store.
pub struct ScratchStore {
    path: PathBuf,
    map: Mutex<HashMap<String, serde_json::Value>>,
}

impl ScratchStore {
    /// Opens the scratch store, loading any existing state.
    ///
    /// A missing file starts empty; an unreadable one is discarded with
    /// a warning, since scratch state is reconstructible.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let map = match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt scratch state");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };
        debug!(path = %path.display(), keys = map.len(), "opened scratch store");
        Ok(Self {
            path: path.to_path_buf(),
            map: Mutex::new(map),
        })
    }

    /// Reads a key, returning `None` when absent or undecodable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let map = self.map.lock();
        let value = map.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Writes a key and persists the whole map.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let mut map = self.map.lock();
        map.insert(key.to_string(), encoded);
        self.persist(&map)
    }

    /// Removes a key and persists the whole map.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock();
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }

    fn persist(&self, map: &HashMap<String, serde_json::Value>) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(map).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        time: i64,
        wait: u32,
        errors: u32,
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.json");

        {
            let store = ScratchStore::open(&path).unwrap();
            store
                .put(
                    "updated/list-a",
                    &Record {
                        time: 1000,
                        wait: 1200,
                        errors: 0,
                    },
                )
                .unwrap();
        }

        let reopened = ScratchStore::open(&path).unwrap();
        let record: Record = reopened.get("updated/list-a").unwrap();
        assert_eq!(
            record,
            Record {
                time: 1000,
                wait: 1200,
                errors: 0,
            }
        );
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = ScratchStore::open(&dir.path().join("absent.json")).unwrap();
        assert!(store.get::<Record>("updated/list-a").is_none());
    }

    #[test]
    fn test_corrupt_file_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.json");
        fs::write(&path, b"not json").unwrap();

        let store = ScratchStore::open(&path).unwrap();
        assert!(store.get::<Record>("updated/list-a").is_none());
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch.json");
        let store = ScratchStore::open(&path).unwrap();
        store
            .put(
                "full_hash_errors/deadbeef",
                &Record {
                    time: 1,
                    wait: 2,
                    errors: 3,
                },
            )
            .unwrap();
        store.remove("full_hash_errors/deadbeef").unwrap();
        assert!(store.get::<Record>("full_hash_errors/deadbeef").is_none());
    }

    #[test]
    fn test_key_helpers() {
        let list = ListName::new("goog-malware-shavar").unwrap();
        assert_eq!(updated_key(&list), "updated/goog-malware-shavar");
        let prefix = Prefix::new([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            full_hash_errors_key(&prefix),
            "full_hash_errors/deadbeef"
        );
    }
}
