//! Typed access to stored JSON documents.

use crate::{StateStorage, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// High-level API for storing and retrieving JSON-encoded state.
pub struct StateManager {
    storage: Box<dyn StateStorage>,
}

impl StateManager {
    /// Create a new state manager with the given storage backend
    pub fn new(storage: Box<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// Serialize `value` and store it under `key`, replacing the previous value.
    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(value).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(key, &encoded)
    }

    /// Load and deserialize the value under `key`.
    ///
    /// A value that no longer deserializes is reported as an encoding error;
    /// callers decide whether to discard it.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string())),
            None => Ok(None),
        }
    }

    /// Remove the value under `key`.
    pub fn remove(&self, key: &str) -> StorageResult<bool> {
        self.storage.delete(key)
    }

    /// Check whether `key` holds a value.
    pub fn contains(&self, key: &str) -> StorageResult<bool> {
        self.storage.has(key)
    }
}
