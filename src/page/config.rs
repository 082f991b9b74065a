use crate::base::category::CategoryKey;
use crate::dom::Element;
use std::collections::BTreeSet;

pub const ENABLED_ATTRIBUTE: &str = "data-enabled";
pub const CHECKED_ATTRIBUTE: &str = "data-checked";
pub const ALTERNATIVES_ATTRIBUTE: &str = "data-alternatives";
pub const NECESSARY_ATTRIBUTE: &str = "data-necessary";

/// Root class: do not open the selector on page load.
pub const HIDE_START_CLASS: &str = "cc-hide-start";

/// Root class: run page code regardless of stored consent.
pub const NO_EXECUTE_CLASS: &str = "cc-no-execute";

/// Widget configuration declared by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageConfig {
    /// Categories that require a decision, in declaration order.
    pub enabled: Vec<CategoryKey>,
    /// Pre-check undecided categories in the selector.
    pub checked_by_default: bool,
    /// Base64 JSON alternative bindings, decoded at controller build time.
    pub alternatives: Option<String>,
    /// Categories that stay allowed when everything is rejected.
    pub necessary: BTreeSet<CategoryKey>,
    pub hide_on_start: bool,
    /// Consent checks always pass (admin and preview pages).
    pub force_allow: bool,
}

impl PageConfig {
    pub fn new<I, K>(enabled: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<CategoryKey>,
    {
        let mut config = Self::default();
        for key in enabled {
            config.push_enabled(key.into());
        }
        config
    }

    pub fn with_checked_by_default(mut self, checked: bool) -> Self {
        self.checked_by_default = checked;
        self
    }

    pub fn with_alternatives(mut self, encoded: impl Into<String>) -> Self {
        self.alternatives = Some(encoded.into());
        self
    }

    pub fn with_necessary<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<CategoryKey>,
    {
        self.necessary = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hide_on_start(mut self, hide: bool) -> Self {
        self.hide_on_start = hide;
        self
    }

    pub fn with_force_allow(mut self, force: bool) -> Self {
        self.force_allow = force;
        self
    }

    /// Read the configuration from the widget root element.
    ///
    /// A missing root, or a root without the enabled-category attribute,
    /// means the widget is absent from this page.
    pub fn from_element(root: Option<&Element>) -> Option<Self> {
        let Some(root) = root else {
            tracing::debug!("no consent widget on page");
            return None;
        };
        let Some(enabled) = root.attribute(ENABLED_ATTRIBUTE) else {
            tracing::warn!(tag = root.tag(), "consent widget root has no enabled categories");
            return None;
        };

        let mut config = Self::new(split_list(enabled));
        config.checked_by_default = root.attribute(CHECKED_ATTRIBUTE) == Some("1");
        config.alternatives = root
            .attribute(ALTERNATIVES_ATTRIBUTE)
            .filter(|blob| !blob.trim().is_empty())
            .map(str::to_string);
        config.necessary = root
            .attribute(NECESSARY_ATTRIBUTE)
            .map(|list| split_list(list).map(CategoryKey::from).collect())
            .unwrap_or_default();
        config.hide_on_start = root.has_class(HIDE_START_CLASS);
        config.force_allow = root.has_class(NO_EXECUTE_CLASS);

        Some(config)
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.enabled.iter().any(|k| k == key)
    }

    pub fn is_necessary(&self, key: &str) -> bool {
        self.necessary.contains(key)
    }

    fn push_enabled(&mut self, key: CategoryKey) {
        if !self.enabled.contains(&key) {
            self.enabled.push(key);
        }
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
