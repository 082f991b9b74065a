//! Deferred content and its activation.
//!
//! Page markup carries content that must not run before consent: scripts,
//! iframes and embeds tagged with a consent category. This module turns those
//! elements into [`DeferredItem`](item::DeferredItem)s, keeps them per
//! category in an [`ItemRegistry`](registry::ItemRegistry), and makes them
//! live through the [`ActivationEngine`](engine::ActivationEngine).
//!
//! | Kind | Activation |
//! |------|------------|
//! | external `<script>` | new script with live `src` replaces the placeholder |
//! | inline `<script>` | body re-inserted, run exactly once ([`script`]) |
//! | `<iframe>` | live `src` set from the deferred source |
//! | embed handler | named handler from the [`HandlerTable`](handlers::HandlerTable) |
//! | `<div>` | passive, nothing to do |
//!
//! # Example
//!
//! ```rust
//! use cookiecontrol::activation::engine::ActivationEngine;
//! use cookiecontrol::dom::{Element, MemoryDocument, KEY_ATTRIBUTE, SRC_ATTRIBUTE};
//!
//! let doc = MemoryDocument::new();
//! let frame = Element::new("iframe")
//!     .with_attribute(KEY_ATTRIBUTE, "youtube")
//!     .with_attribute(SRC_ATTRIBUTE, "https://www.youtube-nocookie.com/embed/x");
//! let id = doc.push(frame.clone());
//!
//! let mut engine = ActivationEngine::new(doc.clone());
//! engine.scan([(id, frame)])?;
//! engine.activate_category(&"youtube".into())?;
//!
//! assert!(doc.element(id).unwrap().has_attribute("src"));
//! # Ok::<(), cookiecontrol::base::consenterror::ConsentError>(())
//! ```

pub mod engine;
pub mod handlers;
pub mod item;
pub mod registry;
pub mod script;
