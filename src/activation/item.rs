//! Deferred item descriptors.

use crate::base::consenterror::ConsentError;
use crate::dom::{Element, ElementId, HANDLER_ATTRIBUTE, SRC_ATTRIBUTE};

/// How a deferred item becomes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// `<script>` with a deferred `src`.
    ScriptExternal { src: String },
    /// `<script>` with an inline body.
    ScriptInline { source: String },
    /// `<iframe>` with a deferred `src`.
    Iframe { src: String },
    /// Any element handed to a named embed handler.
    EmbedHandler { handler: String },
    /// Placeholder with no activation behavior.
    Passive,
}

impl ItemKind {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::ScriptExternal { .. } => "script-external",
            ItemKind::ScriptInline { .. } => "script-inline",
            ItemKind::Iframe { .. } => "iframe",
            ItemKind::EmbedHandler { .. } => "embed-handler",
            ItemKind::Passive => "passive",
        }
    }
}

/// Content withheld until its category is consented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredItem {
    placeholder: ElementId,
    element: Element,
    kind: ItemKind,
}

impl DeferredItem {
    pub fn new(placeholder: ElementId, element: Element, kind: ItemKind) -> Self {
        Self {
            placeholder,
            element,
            kind,
        }
    }

    /// Derive the item kind from a placeholder element.
    ///
    /// A handler attribute wins over the tag name. Tags without activation
    /// rules are rejected rather than silently kept.
    pub fn classify(placeholder: ElementId, element: Element) -> Result<Self, ConsentError> {
        let kind = if let Some(handler) = element.attribute(HANDLER_ATTRIBUTE) {
            ItemKind::EmbedHandler {
                handler: handler.to_string(),
            }
        } else {
            match element.tag() {
                "script" => match element.attribute(SRC_ATTRIBUTE) {
                    Some(src) => ItemKind::ScriptExternal {
                        src: src.to_string(),
                    },
                    None => ItemKind::ScriptInline {
                        source: element.text().to_string(),
                    },
                },
                "iframe" => {
                    let src = element.attribute(SRC_ATTRIBUTE).ok_or_else(|| {
                        ConsentError::MissingDeferredSource {
                            tag: "iframe".to_string(),
                        }
                    })?;
                    ItemKind::Iframe {
                        src: src.to_string(),
                    }
                }
                "div" => ItemKind::Passive,
                tag => {
                    return Err(ConsentError::UnknownItemKind {
                        tag: tag.to_string(),
                    })
                }
            }
        };

        Ok(Self::new(placeholder, element, kind))
    }

    pub fn placeholder(&self) -> ElementId {
        self.placeholder
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }
}
