//! The host document seam.

use super::element::{Element, ElementId};
use crate::base::consenterror::ConsentError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutations the activation engine performs on the host document.
///
/// This is the only way deferred content becomes live. Browser hosts map it
/// onto the real DOM; [`MemoryDocument`] is a self-contained stand-in.
pub trait Document: Send {
    /// Insert `element` as the previous sibling of `anchor`.
    fn insert_before(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError>;

    /// Append `element` as the last child of `anchor`'s parent.
    fn append_sibling(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError>;

    /// Detach `id` from the document.
    fn remove(&mut self, id: ElementId) -> Result<(), ConsentError>;

    /// Set an attribute on a live element.
    fn set_attribute(&mut self, id: ElementId, name: &str, value: &str)
        -> Result<(), ConsentError>;

    /// Whether a page-global boolean flag has been set to `true`.
    fn global_flag(&self, name: &str) -> bool;

    /// Evaluate script source in the page's global scope.
    fn evaluate(&mut self, source: &str) -> Result<(), ConsentError>;
}

impl<D: Document + ?Sized> Document for Box<D> {
    fn insert_before(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError> {
        (**self).insert_before(anchor, element)
    }

    fn append_sibling(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError> {
        (**self).append_sibling(anchor, element)
    }

    fn remove(&mut self, id: ElementId) -> Result<(), ConsentError> {
        (**self).remove(id)
    }

    fn set_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), ConsentError> {
        (**self).set_attribute(id, name, value)
    }

    fn global_flag(&self, name: &str) -> bool {
        (**self).global_flag(name)
    }

    fn evaluate(&mut self, source: &str) -> Result<(), ConsentError> {
        (**self).evaluate(source)
    }
}

#[derive(Default)]
struct Inner {
    // Flat sibling list; every element shares one parent.
    nodes: Vec<(ElementId, Element)>,
    next_id: u64,
    flags: HashSet<String>,
    executed: Vec<String>,
    loaded: Vec<String>,
    native_inline: bool,
}

impl Inner {
    fn position(&self, id: ElementId) -> Result<usize, ConsentError> {
        self.nodes
            .iter()
            .position(|(node, _)| *node == id)
            .ok_or_else(|| ConsentError::ElementNotFound(id.to_string()))
    }

    fn allocate(&mut self) -> ElementId {
        self.next_id += 1;
        ElementId::new(self.next_id)
    }

    /// What a browser does when a script element is connected.
    fn connect_script(&mut self, element: &Element) {
        if element.tag() != "script" {
            return;
        }
        if let Some(src) = element.attribute("src") {
            self.loaded.push(src.to_string());
        } else if self.native_inline {
            let source = element.text().to_string();
            self.run(&source);
        }
    }

    /// Runs `window["name"] = true;` statements and records the rest.
    fn run(&mut self, source: &str) {
        let mut rest = source.trim_start();
        while let Some(after) = rest.strip_prefix("window[\"") {
            let Some((name, tail)) = after.split_once("\"] = true;") else {
                break;
            };
            self.flags.insert(name.to_string());
            rest = tail.trim_start();
        }
        self.executed.push(rest.to_string());
    }
}

/// In-memory document with a single flat parent.
///
/// Scripts connected to it are "executed" by recording their source:
/// external scripts land in [`loaded_scripts`](Self::loaded_scripts), inline
/// scripts in [`executed_scripts`](Self::executed_scripts) when native inline
/// execution is on. Clones share the same document.
#[derive(Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocument {
    /// Document that executes reinserted inline scripts natively.
    pub fn new() -> Self {
        Self::with_native_inline(true)
    }

    /// Document whose native inline execution can be switched off, like
    /// engines that skip reinserted inline scripts.
    pub fn with_native_inline(native_inline: bool) -> Self {
        let doc = Self::default();
        doc.lock().native_inline = native_inline;
        doc
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append an element as parsed markup (scripts in it do not run).
    pub fn push(&self, element: Element) -> ElementId {
        let mut inner = self.lock();
        let id = inner.allocate();
        inner.nodes.push((id, element));
        id
    }

    /// Snapshot of all elements in document order.
    pub fn elements(&self) -> Vec<(ElementId, Element)> {
        self.lock().nodes.clone()
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.lock()
            .nodes
            .iter()
            .find(|(node, _)| *node == id)
            .map(|(_, el)| el.clone())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    /// Inline script bodies executed so far, in order.
    pub fn executed_scripts(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// External script URLs loaded so far, in order.
    pub fn loaded_scripts(&self) -> Vec<String> {
        self.lock().loaded.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }
}

impl Document for MemoryDocument {
    fn insert_before(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError> {
        let mut inner = self.lock();
        let pos = inner.position(anchor)?;
        let id = inner.allocate();
        inner.connect_script(&element);
        inner.nodes.insert(pos, (id, element));
        Ok(id)
    }

    fn append_sibling(
        &mut self,
        anchor: ElementId,
        element: Element,
    ) -> Result<ElementId, ConsentError> {
        let mut inner = self.lock();
        inner.position(anchor)?;
        let id = inner.allocate();
        inner.connect_script(&element);
        inner.nodes.push((id, element));
        Ok(id)
    }

    fn remove(&mut self, id: ElementId) -> Result<(), ConsentError> {
        let mut inner = self.lock();
        let pos = inner.position(id)?;
        inner.nodes.remove(pos);
        Ok(())
    }

    fn set_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), ConsentError> {
        let mut inner = self.lock();
        let pos = inner.position(id)?;
        inner.nodes[pos].1.set_attribute(name, value);
        Ok(())
    }

    fn global_flag(&self, name: &str) -> bool {
        self.lock().flags.contains(name)
    }

    fn evaluate(&mut self, source: &str) -> Result<(), ConsentError> {
        self.lock().run(source);
        Ok(())
    }
}
