//! Core storage trait and the in-memory backend.

use crate::base::consenterror::ConsentError;
use dashmap::DashMap;
use std::sync::Arc;

/// A string key-value store provided by the host environment.
///
/// Implementations must be thread-safe. Every `set` replaces the whole value
/// for its key in one step, so readers never observe a partially written
/// record.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), ConsentError>;
}

/// Blanket implementation for Arc-wrapped stores.
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ConsentError> {
        (**self).remove(key)
    }
}

/// Thread-safe in-memory store.
///
/// Clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConsentError> {
        self.entries.remove(key);
        Ok(())
    }
}
