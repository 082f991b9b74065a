//! Element snapshots exchanged with the host document.

use std::collections::BTreeMap;
use std::fmt;

/// Attribute carrying the consent category of a deferred element.
pub const KEY_ATTRIBUTE: &str = "data-consent-key";

/// Attribute carrying the deferred (not yet live) source URL.
pub const SRC_ATTRIBUTE: &str = "data-consent-src";

/// Attribute naming a custom embed handler.
pub const HANDLER_ATTRIBUTE: &str = "data-consent-handler";

/// Opaque handle of an element in the host document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of an element: tag name, attributes and text content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl Element {
    /// Create an element; the tag name is lowercased.
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self {
            tag: tag.as_ref().to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style text setter.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether the `class` attribute lists `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_is_lowercased() {
        assert_eq!(Element::new("IFRAME").tag(), "iframe");
    }

    #[test]
    fn test_attributes() {
        let mut el = Element::new("script").with_attribute(SRC_ATTRIBUTE, "https://cdn.example/a.js");
        assert!(el.has_attribute(SRC_ATTRIBUTE));
        assert_eq!(el.attribute(SRC_ATTRIBUTE), Some("https://cdn.example/a.js"));

        el.set_attribute("type", "text/plain");
        assert_eq!(el.remove_attribute("type").as_deref(), Some("text/plain"));
        assert!(!el.has_attribute("type"));
    }

    #[test]
    fn test_has_class() {
        let el = Element::new("div").with_attribute("class", "cc  cc-hide-start");
        assert!(el.has_class("cc-hide-start"));
        assert!(el.has_class("cc"));
        assert!(!el.has_class("cc-hide"));
        assert!(!Element::new("div").has_class("cc"));
    }
}
