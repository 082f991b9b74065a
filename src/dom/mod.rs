//! Host document abstraction.
//!
//! The crate never touches a real DOM. Deferred content is described by
//! [`Element`] snapshots, and every live mutation goes through the
//! [`Document`] trait, which a browser host implements on top of its DOM.
//!
//! [`MemoryDocument`] is a complete in-process implementation, used by the
//! test-suite and by headless hosts.

mod document;
mod element;

pub use document::{Document, MemoryDocument};
pub use element::{Element, ElementId, HANDLER_ATTRIBUTE, KEY_ATTRIBUTE, SRC_ATTRIBUTE};
