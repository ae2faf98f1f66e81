//! Key-value stores standing in for the browser's session/local storage.
//!
//! Two scopes exist:
//! - the *session* store holds claims and tenant state and is wiped on sign-out
//! - the *persistent* store survives restarts (conversation id, ticket read
//!   markers)
//!
//! Stores are infallible from the caller's point of view; a store that cannot
//! write logs and keeps its in-memory copy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;

use axentia_core::generate_id;

pub mod keys {
    pub const BACKEND_ENDPOINT: &str = "n8n_endpoint";
    pub const ROLE: &str = "user_role";
    pub const TENANT_ID: &str = "company_id";
    pub const SELECTED_TENANT: &str = "selected_company_id";
    pub const TENANT_DIRECTORY: &str = "admin_companies";

    /// Every key cleared on sign-out.
    pub const SESSION_KEYS: [&str; 5] = [BACKEND_ENDPOINT, ROLE, TENANT_ID, SELECTED_TENANT, TENANT_DIRECTORY];

    pub const CONVERSATION_ID: &str = "chat_session_id";

    pub fn ticket_seen(uid: &str) -> String {
        format!("ticket_seen_{uid}")
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding unreadable stored value");
            None
        }
    }
}

pub fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(err) => tracing::warn!(key, error = %err, "value not stored"),
    }
}

/// Remove every session-scoped key.
pub fn clear_session(store: &dyn KeyValueStore) {
    for key in keys::SESSION_KEYS {
        store.remove(key);
    }
}

/// Conversation identifier for chat interactions, generated on first use.
pub fn conversation_id(store: &dyn KeyValueStore) -> String {
    if let Some(existing) = store.get(keys::CONVERSATION_ID).filter(|id| !id.is_empty()) {
        return existing;
    }
    let id = generate_id();
    store.set(keys::CONVERSATION_ID, &id);
    id
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

/// JSON-file backed store. Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A missing or unreadable
    /// file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed state file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_string_pretty(entries)?;
            std::fs::write(&self.path, raw)
        })();

        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to persist state");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.flush(&entries);
        }
    }
}
