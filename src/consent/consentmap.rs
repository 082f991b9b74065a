//! The persisted per-category decision record.

use crate::base::category::CategoryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-category consent decisions.
///
/// `true` means allowed, `false` declined, absence undecided. Serializes as
/// a flat JSON object, e.g. `{"stats":false,"video":true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentMap {
    decisions: BTreeMap<CategoryKey, bool>,
}

impl ConsentMap {
    /// Create an empty map (everything undecided).
    pub fn new() -> Self {
        Self::default()
    }

    /// The decision for `key`, `None` if undecided.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.decisions.get(key).copied()
    }

    /// `true` only for an explicit allow.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.get(key) == Some(true)
    }

    /// Whether a decision (either way) exists for `key`.
    pub fn is_decided(&self, key: &str) -> bool {
        self.decisions.contains_key(key)
    }

    /// Record a decision, returning the previous one.
    pub fn insert(&mut self, key: impl Into<CategoryKey>, allow: bool) -> Option<bool> {
        self.decisions.insert(key.into(), allow)
    }

    /// Forget the decision for `key`.
    pub fn remove(&mut self, key: &str) -> Option<bool> {
        self.decisions.remove(key)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<CategoryKey>, allow: bool) -> Self {
        self.insert(key, allow);
        self
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// All decisions in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CategoryKey, bool)> {
        self.decisions.iter().map(|(k, v)| (k, *v))
    }

    /// Decided keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &CategoryKey> {
        self.decisions.keys()
    }

    /// Keys with an explicit allow.
    pub fn allowed(&self) -> impl Iterator<Item = &CategoryKey> {
        self.decisions.iter().filter(|(_, v)| **v).map(|(k, _)| k)
    }

    /// Serialize to the storage representation.
    pub fn to_json(&self) -> String {
        // A map of string keys to bools always serializes.
        serde_json::to_string(&self.decisions).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<K: Into<CategoryKey>> FromIterator<(K, bool)> for ConsentMap {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self {
            decisions: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<CategoryKey>, const N: usize> From<[(K, bool); N]> for ConsentMap {
    fn from(entries: [(K, bool); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl fmt::Display for ConsentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_state() {
        let map = ConsentMap::from([("video", true), ("stats", false)]);

        assert_eq!(map.get("video"), Some(true));
        assert_eq!(map.get("stats"), Some(false));
        assert_eq!(map.get("maps"), None);

        assert!(map.is_allowed("video"));
        assert!(!map.is_allowed("stats"));
        assert!(!map.is_allowed("maps"));
        assert!(map.is_decided("stats"));
        assert!(!map.is_decided("maps"));
    }

    #[test]
    fn test_json_shape() {
        let map = ConsentMap::from([("video", true), ("stats", false)]);
        assert_eq!(map.to_json(), r#"{"stats":false,"video":true}"#);

        let parsed: ConsentMap = serde_json::from_str(&map.to_json()).unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn test_rejects_null_entries() {
        assert!(serde_json::from_str::<ConsentMap>(r#"{"video":null}"#).is_err());
    }

    #[test]
    fn test_allowed_iter() {
        let map = ConsentMap::from([("a", true), ("b", false), ("c", true)]);
        let allowed: Vec<&str> = map.allowed().map(|k| k.as_str()).collect();
        assert_eq!(allowed, vec!["a", "c"]);
    }
}
