//! Persisted search history for the search bar's autocomplete dropdown.
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::warn;

pub const MAX_HISTORY_ITEMS: usize = 10;

/// Read-modify-write over the store on every call; there is no in-memory
/// copy. Read failures yield an empty history.
pub struct SearchHistory {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            key: format!("{}_search_history", namespace),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        let blob = match self.store.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(?err, "failed to read search history");
                return Vec::new();
            }
        };
        serde_json::from_str(&blob).unwrap_or_else(|err| {
            warn!(?err, "failed to parse search history");
            Vec::new()
        })
    }

    /// Most-recent-first insert with case-insensitive de-duplication and a
    /// hard cap of [`MAX_HISTORY_ITEMS`] entries. Blank queries are ignored.
    pub fn push(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let mut entries = self.entries();
        entries.retain(|entry| !entry.eq_ignore_ascii_case(query));
        entries.insert(0, query.to_string());
        entries.truncate(MAX_HISTORY_ITEMS);
        self.write(&entries);
    }

    /// Exact-match removal of one entry.
    pub fn remove(&self, query: &str) {
        let mut entries = self.entries();
        entries.retain(|entry| entry != query);
        self.write(&entries);
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(&self.key) {
            warn!(?err, "failed to clear search history");
        }
    }

    fn write(&self, entries: &[String]) {
        let blob = match serde_json::to_string(entries) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(?err, "failed to serialize search history");
                return;
            }
        };
        if let Err(err) = self.store.write(&self.key, &blob) {
            warn!(?err, "failed to persist search history");
        }
    }
}
