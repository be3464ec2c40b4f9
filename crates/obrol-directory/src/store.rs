//! Persisted recency lists.
//!
//! One list per local user id: the contacts most recently exchanged
//! messages with, newest first, deduplicated, capped. Store failures are
//! swallowed; a broken store behaves as an empty one.

use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use tracing::debug;

/// Maximum entries kept per user.
pub const RECENCY_CAP: usize = 20;

/// Persisted recency list, keyed by the local user's id.
///
/// Implementations must never panic or propagate errors: `push` swallows
/// write failures, `get` returns empty on read failures.
pub trait RecencyStore: Send + Sync {
    /// Record `other_id` as the most recent counterpart of `my_id`.
    ///
    /// No-op when either id is empty. Removes any prior occurrence,
    /// prepends, and truncates to [`RECENCY_CAP`].
    fn push(&self, my_id: &str, other_id: &str);

    /// The recency list for `my_id`, newest first. Empty when absent or
    /// unreadable.
    fn get(&self, my_id: &str) -> Vec<String>;
}

/// Apply the push semantics to one user's list.
fn push_into(list: &mut Vec<String>, other_id: &str) {
    list.retain(|id| id != other_id);
    list.insert(0, other_id.to_string());
    list.truncate(RECENCY_CAP);
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecencyStore for MemoryStore {
    fn push(&self, my_id: &str, other_id: &str) {
        if my_id.is_empty() || other_id.is_empty() {
            return;
        }
        if let Ok(mut map) = self.map.lock() {
            push_into(map.entry(my_id.to_string()).or_default(), other_id);
        }
    }

    fn get(&self, my_id: &str) -> Vec<String> {
        self.map
            .lock()
            .ok()
            .and_then(|map| map.get(my_id).cloned())
            .unwrap_or_default()
    }
}

/// File-backed store: one JSON object mapping user id to recency list.
///
/// Read-modify-write on every push. Corrupt or missing files read as
/// empty; write failures are logged at debug and dropped.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> HashMap<String, Vec<String>> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!(path = %self.path.display(), error = %e, "recency store unreadable, treating as empty");
            HashMap::new()
        })
    }

    fn write_map(&self, map: &HashMap<String, Vec<String>>) {
        let json = match serde_json::to_string(map) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "recency store serialization failed");
                return;
            },
        };
        if let Err(e) = fs::write(&self.path, json) {
            debug!(path = %self.path.display(), error = %e, "recency store write failed");
        }
    }
}

impl RecencyStore for JsonFileStore {
    fn push(&self, my_id: &str, other_id: &str) {
        if my_id.is_empty() || other_id.is_empty() {
            return;
        }
        let mut map = self.read_map();
        push_into(map.entry(my_id.to_string()).or_default(), other_id);
        self.write_map(&map);
    }

    fn get(&self, my_id: &str) -> Vec<String> {
        self.read_map().remove(my_id).unwrap_or_default()
    }
}
