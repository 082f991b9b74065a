//! Durable consent record and visitor identifier.

use crate::base::consenterror::ConsentError;
use crate::base::random::generate_visitor_id;
use crate::consent::consentmap::ConsentMap;
use crate::storage::KeyValueStore;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Storage key of the serialized [`ConsentMap`].
pub const CONSENT_MAP_KEY: &str = "consent-map";

/// Storage key of the visitor identifier.
pub const VISITOR_ID_KEY: &str = "visitor-id";

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Stable per-profile identifier sent with consent beacons.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VisitorId(String);

impl VisitorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notification emitted on every consent mutation.
///
/// Carries no state; subscribers re-read the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsentChanged;

/// Consent record on top of a host [`KeyValueStore`].
///
/// Clones share the backend and the change channel.
#[derive(Clone)]
pub struct ConsentStore {
    backend: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<ConsentChanged>,
}

impl ConsentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { backend, changes }
    }

    /// The underlying key-value store.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.changes.subscribe()
    }

    /// Read the persisted decisions.
    ///
    /// Absent, unreadable or malformed records all read as an empty map.
    pub fn get(&self) -> ConsentMap {
        let raw = match self.backend.get(CONSENT_MAP_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ConsentMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "consent record unreadable, treating as undecided");
                return ConsentMap::new();
            }
        };

        match serde_json::from_str::<Option<ConsentMap>>(&raw) {
            Ok(map) => map.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "malformed consent record, treating as undecided");
                ConsentMap::new()
            }
        }
    }

    /// Replace the persisted decisions with `map` in a single write.
    pub fn set(&self, map: &ConsentMap) -> Result<(), ConsentError> {
        self.backend.set(CONSENT_MAP_KEY, &map.to_json())?;
        tracing::debug!(decisions = map.len(), "consent record stored");
        self.notify();
        Ok(())
    }

    /// Remove the record entirely.
    pub fn clear(&self) -> Result<(), ConsentError> {
        self.backend.remove(CONSENT_MAP_KEY)?;
        tracing::debug!("consent record cleared");
        self.notify();
        Ok(())
    }

    /// The persisted visitor id, generated and stored on first use.
    pub fn visitor_id(&self) -> Result<VisitorId, ConsentError> {
        if let Some(id) = self.backend.get(VISITOR_ID_KEY)?.filter(|id| !id.is_empty()) {
            return Ok(VisitorId(id));
        }

        let id = generate_visitor_id();
        self.backend.set(VISITOR_ID_KEY, &id)?;
        tracing::debug!(visitor_id = %id, "generated visitor id");
        Ok(VisitorId(id))
    }

    fn notify(&self) {
        // No subscribers is fine.
        let _ = self.changes.send(ConsentChanged);
    }
}

impl fmt::Debug for ConsentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentStore")
            .field("subscribers", &self.changes.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (ConsentStore, MemoryStore) {
        let backend = MemoryStore::new();
        (ConsentStore::new(Arc::new(backend.clone())), backend)
    }

    #[test]
    fn test_absent_reads_empty() {
        let (store, _) = store();
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_corrupt_reads_empty() {
        let (store, backend) = store();
        backend.set(CONSENT_MAP_KEY, "{video: yes").unwrap();
        assert!(store.get().is_empty());

        backend.set(CONSENT_MAP_KEY, "null").unwrap();
        assert!(store.get().is_empty());

        backend.set(CONSENT_MAP_KEY, "[1,2]").unwrap();
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_set_replaces() {
        let (store, _) = store();
        store.set(&ConsentMap::from([("a", true), ("b", true)])).unwrap();
        store.set(&ConsentMap::from([("c", false)])).unwrap();

        assert_eq!(store.get(), ConsentMap::from([("c", false)]));
    }

    #[test]
    fn test_clear_removes_record() {
        let (store, backend) = store();
        store.set(&ConsentMap::from([("a", true)])).unwrap();
        store.clear().unwrap();

        assert_eq!(backend.get(CONSENT_MAP_KEY).unwrap(), None);
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_visitor_id_is_stable() {
        let (store, _) = store();
        let first = store.visitor_id().unwrap();
        let second = store.visitor_id().unwrap();
        assert_eq!(first, second);

        store.set(&ConsentMap::from([("a", true)])).unwrap();
        store.clear().unwrap();
        assert_eq!(store.visitor_id().unwrap(), first);
    }

    #[test]
    fn test_existing_visitor_id_is_kept() {
        let (store, backend) = store();
        backend.set(VISITOR_ID_KEY, "fixed-id").unwrap();
        assert_eq!(store.visitor_id().unwrap().as_str(), "fixed-id");
    }

    #[test]
    fn test_change_notifications() {
        let (store, _) = store();
        let mut rx = store.subscribe();

        store.set(&ConsentMap::new()).unwrap();
        store.clear().unwrap();

        assert_eq!(rx.try_recv().unwrap(), ConsentChanged);
        assert_eq!(rx.try_recv().unwrap(), ConsentChanged);
        assert!(rx.try_recv().is_err());
    }
}
