//! Persistent key-value store adapter.
//!
//! The web client kept everything in `localStorage`; here the store is an
//! explicit, injectable object handed by reference to its consumers (cart,
//! search history, session) so tests run against an in-memory double. Keys
//! are namespaced by the caller (`{namespace}_cart`, `{namespace}_access_token`,
//! ...); the store itself is namespace-agnostic.
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract for persisted blobs. All operations are synchronous: blobs are
/// small and callers wrap every access in a fail-soft boundary.
pub trait KeyValueStore: Send + Sync {
    /// Returns the exact string previously written under `key`, or None.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Drops every key this store holds.
    fn clear(&self) -> Result<(), StoreError>;
}

/// File-backed store: one file per key under a data directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Keys become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

/// In-memory store for deterministic tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trip_is_exact() {
        let td = tempdir().unwrap();
        let store = FileStore::open(td.path()).unwrap();
        let blob = r#"[{"id":1,"title":"Jacket","price":20.0,"image":"","size":null}]"#;
        store.write("thriftgram_cart", blob).unwrap();
        assert_eq!(store.read("thriftgram_cart").unwrap().as_deref(), Some(blob));
    }

    #[test]
    fn missing_key_reads_none_and_remove_is_idempotent() {
        let td = tempdir().unwrap();
        let store = FileStore::open(td.path()).unwrap();
        assert_eq!(store.read("absent").unwrap(), None);
        store.remove("absent").unwrap();
    }

    #[test]
    fn clear_drops_every_key() {
        let td = tempdir().unwrap();
        let store = FileStore::open(td.path()).unwrap();
        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();
        store.clear().unwrap();
        assert_eq!(store.read("a").unwrap(), None);
        assert_eq!(store.read("b").unwrap(), None);
    }

    #[test]
    fn keys_are_sanitized_to_file_names() {
        assert_eq!(sanitize_key("thriftgram_cart"), "thriftgram_cart");
        assert_eq!(sanitize_key("weird/key name"), "weird_key_name");
    }

    #[test]
    fn memory_store_behaves_like_file_store() {
        let store = MemoryStore::new();
        store.write("k", "v").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
    }
}
