//! Named embed handlers.
//!
//! Elements carrying the handler attribute are activated by the handler of
//! that name instead of by tag. The table is explicit: an unknown name is a
//! configuration error, never a silent skip.

use super::item::{DeferredItem, ItemKind};
use crate::base::consenterror::ConsentError;
use crate::dom::{Document, SRC_ATTRIBUTE};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Attribute holding the lazily rendered video embed markup.
pub const VIDEO_EMBED_LAZY_ATTRIBUTE: &str = "data-video-embed-field-lazy";

/// Handler name of [`VideoEmbedFieldLazy`].
pub const VIDEO_EMBED_LAZY: &str = "videoEmbedFieldLazy";

/// Custom activation logic for one kind of embed.
pub trait EmbedHandler: Send + Sync {
    fn activate(&self, document: &mut dyn Document, item: &DeferredItem)
        -> Result<(), ConsentError>;
}

impl<F> EmbedHandler for F
where
    F: Fn(&mut dyn Document, &DeferredItem) -> Result<(), ConsentError> + Send + Sync,
{
    fn activate(
        &self,
        document: &mut dyn Document,
        item: &DeferredItem,
    ) -> Result<(), ConsentError> {
        self(document, item)
    }
}

/// Lazy video embeds keep their iframe markup in an attribute, rendered on
/// click. Activation drops the placeholder `src` from that markup and turns
/// the deferred source attribute into the live `src`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VideoEmbedFieldLazy;

impl VideoEmbedFieldLazy {
    /// Rewrite lazy embed markup so its deferred source becomes live.
    pub fn rewrite(markup: &str) -> String {
        let without_placeholder = remove_placeholder_src(markup);
        without_placeholder.replacen(SRC_ATTRIBUTE, "src", 1)
    }
}

impl EmbedHandler for VideoEmbedFieldLazy {
    fn activate(
        &self,
        document: &mut dyn Document,
        item: &DeferredItem,
    ) -> Result<(), ConsentError> {
        let markup = item
            .element()
            .attribute(VIDEO_EMBED_LAZY_ATTRIBUTE)
            .ok_or_else(|| ConsentError::MissingDeferredSource {
                tag: item.element().tag().to_string(),
            })?;

        document.set_attribute(
            item.placeholder(),
            VIDEO_EMBED_LAZY_ATTRIBUTE,
            &Self::rewrite(markup),
        )
    }
}

/// Removes the first ` src="..."` whose attribute name is not itself the
/// tail of a hyphenated name, together with the character before it.
fn remove_placeholder_src(markup: &str) -> String {
    const NEEDLE: &str = "src=\"";
    let mut from = 0;

    while let Some(offset) = markup[from..].find(NEEDLE) {
        let at = from + offset;
        from = at + NEEDLE.len();

        let Some(prev) = markup[..at].chars().next_back() else {
            continue;
        };
        if prev == '-' {
            continue;
        }
        let Some(close) = markup[from..].find('"') else {
            break;
        };

        let start = at - prev.len_utf8();
        let end = from + close + 1;
        return format!("{}{}", &markup[..start], &markup[end..]);
    }

    markup.to_string()
}

/// Name → handler lookup for embed items.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn EmbedHandler>>,
}

impl HandlerTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in handlers.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(VIDEO_EMBED_LAZY, VideoEmbedFieldLazy);
        table
    }

    /// Register (or replace) a handler.
    pub fn register(&mut self, name: impl Into<String>, handler: impl EmbedHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn EmbedHandler>, ConsentError> {
        self.handlers
            .get(name)
            .ok_or_else(|| ConsentError::unknown_handler(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Reject an embed item whose handler name does not resolve.
    pub fn check(&self, item: &DeferredItem) -> Result<(), ConsentError> {
        match item.kind() {
            ItemKind::EmbedHandler { handler } => self.get(handler).map(|_| ()),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerTable").field("handlers", &names).finish()
    }
}
