//! Consent category identifiers.

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// A consent category, e.g. an integration name such as `youtube` or `matomo`.
///
/// Keys are opaque and case-sensitive; `Video` and `video` are different
/// categories.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKey {
    key: Box<str>,
}

impl CategoryKey {
    /// Creates a new [`CategoryKey`] from any string-like type.
    #[inline]
    pub fn new(key: impl Into<Box<str>>) -> Self {
        Self { key: key.into() }
    }

    /// View the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl From<&str> for CategoryKey {
    fn from(value: &str) -> Self {
        CategoryKey::new(value)
    }
}

impl From<String> for CategoryKey {
    fn from(value: String) -> Self {
        CategoryKey::new(value)
    }
}

impl From<&CategoryKey> for CategoryKey {
    fn from(value: &CategoryKey) -> Self {
        value.clone()
    }
}

impl Borrow<str> for CategoryKey {
    fn borrow(&self) -> &str {
        &self.key
    }
}

impl AsRef<str> for CategoryKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl PartialEq<str> for CategoryKey {
    fn eq(&self, other: &str) -> bool {
        &*self.key == other
    }
}

impl PartialEq<&str> for CategoryKey {
    fn eq(&self, other: &&str) -> bool {
        &*self.key == *other
    }
}

impl fmt::Debug for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.key, f)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(CategoryKey::new("video"), 1);

        assert_eq!(map.get("video"), Some(&1));
        assert_eq!(map.get("Video"), None);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = CategoryKey::from("stats");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"stats\"");
    }
}
