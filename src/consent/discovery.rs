//! Discovery log: which categories were seen on the page.
//!
//! Used while setting a site up, to audit which categories the markup
//! actually references. Presence of the storage key means discovery is on.

use crate::base::category::CategoryKey;
use crate::base::consenterror::ConsentError;
use crate::storage::KeyValueStore;
use std::sync::Arc;

/// Storage key of the discovery log.
pub const DISCOVERY_LOG_KEY: &str = "discovery-log";

/// Durable insertion-ordered set of discovered categories.
#[derive(Clone)]
pub struct DiscoveryLog {
    backend: Arc<dyn KeyValueStore>,
}

impl DiscoveryLog {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Start (or restart) discovery with an empty log.
    pub fn enable(&self) -> Result<(), ConsentError> {
        self.backend.set(DISCOVERY_LOG_KEY, "[]")
    }

    /// Stop discovery and drop the log.
    pub fn disable(&self) -> Result<(), ConsentError> {
        self.backend.remove(DISCOVERY_LOG_KEY)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend.get(DISCOVERY_LOG_KEY), Ok(Some(_)))
    }

    /// Append `key` unless already present. No-op while disabled.
    pub fn record(&self, key: &CategoryKey) -> Result<(), ConsentError> {
        let Some(mut keys) = self.read() else {
            return Ok(());
        };

        if keys.contains(key) {
            return Ok(());
        }

        keys.push(key.clone());
        let json = serde_json::to_string(&keys).map_err(|e| ConsentError::StorageWrite {
            key: DISCOVERY_LOG_KEY.to_string(),
            message: e.to_string(),
        })?;
        self.backend.set(DISCOVERY_LOG_KEY, &json)?;
        tracing::debug!(category = %key, "discovered category");
        Ok(())
    }

    /// Discovered keys in discovery order, `None` if discovery is off.
    ///
    /// A malformed log reads as enabled and empty.
    pub fn read(&self) -> Option<Vec<CategoryKey>> {
        let raw = match self.backend.get(DISCOVERY_LOG_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "discovery log unreadable");
                return None;
            }
        };

        match serde_json::from_str::<Vec<CategoryKey>>(&raw) {
            Ok(keys) => Some(keys),
            Err(e) => {
                tracing::warn!(error = %e, "malformed discovery log, restarting it");
                Some(Vec::new())
            }
        }
    }
}
