//! Per-category buckets of deferred items.

use super::item::DeferredItem;
use crate::base::category::CategoryKey;
use crate::base::consenterror::ConsentError;
use crate::consent::discovery::DiscoveryLog;
use crate::dom::{Element, ElementId, KEY_ATTRIBUTE};
use std::collections::HashMap;

/// Deferred items discovered on the page, grouped by category.
///
/// Rebuilt on every page load. Items leave the registry only through
/// [`drain`](Self::drain), which hands ownership to the caller.
#[derive(Default)]
pub struct ItemRegistry {
    buckets: HashMap<CategoryKey, Vec<DeferredItem>>,
    discovery: Option<DiscoveryLog>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that records every registered category in `discovery`.
    pub fn with_discovery(discovery: DiscoveryLog) -> Self {
        Self {
            buckets: HashMap::new(),
            discovery: Some(discovery),
        }
    }

    /// Append `item` to the bucket for `key`.
    pub fn register(&mut self, key: impl Into<CategoryKey>, item: DeferredItem) {
        let key = key.into();

        if let Some(discovery) = &self.discovery {
            if let Err(e) = discovery.record(&key) {
                tracing::warn!(category = %key, error = %e, "failed to record discovery");
            }
        }

        tracing::debug!(category = %key, kind = item.kind().name(), element = %item.placeholder(), "registered deferred item");
        self.buckets.entry(key).or_default().push(item);
    }

    /// Take every item registered for `key`, leaving the bucket empty.
    pub fn drain(&mut self, key: &str) -> Vec<DeferredItem> {
        self.buckets.remove(key).unwrap_or_default()
    }

    /// Put items back at the front of `key`'s bucket.
    pub(crate) fn restore(&mut self, key: &CategoryKey, mut items: Vec<DeferredItem>) {
        if items.is_empty() {
            return;
        }
        let bucket = self.buckets.entry(key.clone()).or_default();
        items.append(bucket);
        *bucket = items;
    }

    /// Register every element carrying the category attribute.
    ///
    /// The attribute is stripped from the stored snapshot. Elements are
    /// registered in document order. Returns the number registered.
    pub fn scan<I>(&mut self, elements: I) -> Result<usize, ConsentError>
    where
        I: IntoIterator<Item = (ElementId, Element)>,
    {
        self.scan_with(elements, |_| Ok(()))
    }

    /// Like [`scan`](Self::scan), with `check` run on each classified item.
    ///
    /// A rejected element does not stop the scan: every valid element is
    /// registered, then the rejections are returned together as
    /// [`ConsentError::RejectedItems`].
    pub fn scan_with<I, F>(&mut self, elements: I, mut check: F) -> Result<usize, ConsentError>
    where
        I: IntoIterator<Item = (ElementId, Element)>,
        F: FnMut(&DeferredItem) -> Result<(), ConsentError>,
    {
        let mut registered = 0;
        let mut rejected = Vec::new();

        for (id, mut element) in elements {
            let Some(key) = element.remove_attribute(KEY_ATTRIBUTE) else {
                continue;
            };

            match DeferredItem::classify(id, element).and_then(|item| check(&item).map(|()| item)) {
                Ok(item) => {
                    self.register(key, item);
                    registered += 1;
                }
                Err(e) => {
                    tracing::warn!(category = %key, element = %id, error = %e, "rejected deferred element");
                    rejected.push(e);
                }
            }
        }

        if rejected.is_empty() {
            Ok(registered)
        } else {
            Err(ConsentError::RejectedItems { registered, rejected })
        }
    }

    /// Number of pending items for `key`.
    pub fn pending(&self, key: &str) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Categories with pending items.
    pub fn categories(&self) -> impl Iterator<Item = &CategoryKey> {
        self.buckets.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| k)
    }

    /// Total number of pending items.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
