//! Deferred-activation engine.

use super::handlers::HandlerTable;
use super::item::{DeferredItem, ItemKind};
use super::registry::ItemRegistry;
use super::script::{MarkerShim, ScriptExecution};
use crate::base::category::CategoryKey;
use crate::base::consenterror::ConsentError;
use crate::dom::{Document, Element, ElementId, SRC_ATTRIBUTE};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Observer told about every activation pass, before any item runs.
pub type ActivationObserver = Arc<dyn Fn(&CategoryKey) + Send + Sync>;

/// One-shot callback fired after a category's items are live.
pub type ActivationCallback = Box<dyn FnOnce(&CategoryKey) + Send>;

/// Outcome of one [`ActivationEngine::activate_category`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub category: CategoryKey,
    /// Items made live in this pass.
    pub activated: usize,
    /// Callbacks fired in this pass.
    pub callbacks: usize,
}

/// Turns deferred items into live content, exactly once per item.
///
/// Owns the item registry, the document handle, the embed handler table and
/// every observer and callback; nothing is read from ambient globals.
pub struct ActivationEngine {
    registry: ItemRegistry,
    document: Box<dyn Document>,
    handlers: HandlerTable,
    execution: Box<dyn ScriptExecution>,
    observers: Vec<ActivationObserver>,
    callbacks: HashMap<CategoryKey, Vec<ActivationCallback>>,
    activated: HashSet<CategoryKey>,
}

impl ActivationEngine {
    /// Engine over `document` with the built-in handlers and the marker shim.
    pub fn new(document: impl Document + 'static) -> Self {
        Self {
            registry: ItemRegistry::new(),
            document: Box::new(document),
            handlers: HandlerTable::with_defaults(),
            execution: Box::new(MarkerShim),
            observers: Vec::new(),
            callbacks: HashMap::new(),
            activated: HashSet::new(),
        }
    }

    pub fn with_registry(mut self, registry: ItemRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_execution(mut self, execution: impl ScriptExecution + 'static) -> Self {
        self.execution = Box::new(execution);
        self
    }

    pub fn with_observers(mut self, observers: Vec<ActivationObserver>) -> Self {
        self.observers = observers;
        self
    }

    /// Add an observer; observers run in registration order.
    pub fn add_observer(&mut self, observer: ActivationObserver) {
        self.observers.push(observer);
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ItemRegistry {
        &mut self.registry
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Register a deferred item under `key`.
    pub fn register(&mut self, key: impl Into<CategoryKey>, item: DeferredItem) {
        self.registry.register(key, item);
    }

    /// Register every tagged element; see [`ItemRegistry::scan_with`].
    ///
    /// Embed items naming a handler missing from the table are rejected here,
    /// at load, alongside unknown element kinds.
    pub fn scan<I>(&mut self, elements: I) -> Result<usize, ConsentError>
    where
        I: IntoIterator<Item = (ElementId, Element)>,
    {
        let handlers = &self.handlers;
        self.registry.scan_with(elements, |item| handlers.check(item))
    }

    /// Whether `key` has completed at least one activation pass.
    pub fn is_activated(&self, key: &str) -> bool {
        self.activated.contains(key)
    }

    /// Run `callback` once `key` is activated.
    ///
    /// Fires immediately if `key` has already been activated; otherwise it
    /// is queued and fires at the end of the next activation pass.
    pub fn on_activated<F>(&mut self, key: impl Into<CategoryKey>, callback: F)
    where
        F: FnOnce(&CategoryKey) + Send + 'static,
    {
        let key = key.into();
        if self.activated.contains(&key) {
            callback(&key);
            return;
        }
        self.callbacks.entry(key).or_default().push(Box::new(callback));
    }

    /// Activate every pending item of `key`, then fire its callbacks.
    ///
    /// A configuration error aborts the pass: items not yet activated are
    /// put back into the registry and no callbacks fire.
    pub fn activate_category(&mut self, key: &CategoryKey) -> Result<ActivationReport, ConsentError> {
        self.notify_observers(key);

        let mut items = self.registry.drain(key.as_str()).into_iter();
        let mut activated = 0;

        while let Some(item) = items.next() {
            if let Err(e) = self.activate_item(&item) {
                tracing::error!(category = %key, kind = item.kind().name(), error = %e, "activation aborted");
                let mut remaining = vec![item];
                remaining.extend(items);
                self.registry.restore(key, remaining);
                return Err(e);
            }
            activated += 1;
        }

        self.activated.insert(key.clone());

        let callbacks = self.callbacks.remove(key).unwrap_or_default();
        let fired = callbacks.len();
        for callback in callbacks {
            callback(key);
        }

        tracing::debug!(category = %key, activated, callbacks = fired, "category activated");

        Ok(ActivationReport {
            category: key.clone(),
            activated,
            callbacks: fired,
        })
    }

    fn notify_observers(&self, key: &CategoryKey) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| observer(key))).is_err() {
                tracing::error!(category = %key, "activation observer panicked");
            }
        }
    }

    fn activate_item(&mut self, item: &DeferredItem) -> Result<(), ConsentError> {
        let placeholder = item.placeholder();

        match item.kind() {
            ItemKind::ScriptExternal { src } => {
                let mut script = item.element().clone();
                script.remove_attribute(SRC_ATTRIBUTE);
                script.remove_attribute("type");
                script.set_attribute("src", src.as_str());

                self.document.insert_before(placeholder, script)?;
                self.document.remove(placeholder)?;
            }
            ItemKind::ScriptInline { .. } => {
                let mut script = item.element().clone();
                script.set_attribute("type", "text/javascript");

                self.execution
                    .run_inline(self.document.as_mut(), placeholder, script)?;
                self.document.remove(placeholder)?;
            }
            ItemKind::Iframe { src } => {
                self.document.set_attribute(placeholder, "src", src)?;
            }
            ItemKind::EmbedHandler { handler } => {
                let handler = Arc::clone(self.handlers.get(handler)?);
                handler.activate(self.document.as_mut(), item)?;
            }
            ItemKind::Passive => {}
        }

        Ok(())
    }
}

impl fmt::Debug for ActivationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationEngine")
            .field("pending_items", &self.registry.len())
            .field("handlers", &self.handlers)
            .field("observers", &self.observers.len())
            .field("activated", &self.activated)
            .finish()
    }
}
