//! Consent controller with builder pattern.
//!
//! Ties the consent store, the activation engine, the fallback registry and
//! the tracking beacon together.
//!
//! # Example
//!
//! ```rust,ignore
//! use cookiecontrol::{ConsentController, PageConfig, PageContext};
//!
//! let config = PageConfig::from_element(root.as_ref()).ok_or("no widget")?;
//! let page = PageContext::parse("https://shop.example/")?;
//!
//! let mut controller = ConsentController::builder(config, page)
//!     .storage(SqliteStore::open("profile/storage.db")?)
//!     .build()?;
//!
//! controller.scan(document.elements())?;
//! controller.activate_consented()?;
//!
//! if controller.should_show_selector() {
//!     // render the selector with controller.initial_selection()
//! }
//! ```

use crate::activation::engine::{ActivationCallback, ActivationEngine, ActivationObserver, ActivationReport};
use crate::activation::handlers::{EmbedHandler, HandlerTable};
use crate::activation::registry::ItemRegistry;
use crate::activation::script::ScriptExecution;
use crate::alternative::{
    AlternativeHandler, AlternativeHandlers, AlternativeRegistry, AnalyticsPageview,
    ANALYTICS_HANDLER,
};
use crate::base::category::CategoryKey;
use crate::base::consenterror::ConsentError;
use crate::consent::consentmap::ConsentMap;
use crate::consent::discovery::DiscoveryLog;
use crate::consent::store::{ConsentChanged, ConsentStore, VisitorId};
use crate::dom::{Document, Element, ElementId, MemoryDocument};
use crate::page::{PageConfig, PageContext};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::tracking::{
    consent_beacon_url, BeaconRequest, BeaconResponse, BeaconTransport, HttpTransport,
    DEFAULT_TRACKING_PATH,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

/// Observer told about every consent beacon outcome.
pub type TrackObserver = Arc<dyn Fn(&Result<BeaconResponse, ConsentError>) + Send + Sync>;

/// What a decision pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionReport {
    /// One entry per allowed category, in key order.
    pub activations: Vec<ActivationReport>,
    /// Categories whose fallback ran.
    pub fallbacks: Vec<CategoryKey>,
}

/// The consent widget's state machine.
///
/// Use [`ConsentController::builder()`] to configure and create one.
pub struct ConsentController {
    config: PageConfig,
    store: ConsentStore,
    discovery: DiscoveryLog,
    engine: ActivationEngine,
    alternatives: AlternativeRegistry,
    transport: Arc<dyn BeaconTransport>,
    tracking_endpoint: Url,
    track_observers: Vec<TrackObserver>,
    granted: HashMap<CategoryKey, Vec<ActivationCallback>>,
}

impl ConsentController {
    /// Create a builder for the widget described by `config` on `page`.
    pub fn builder(config: PageConfig, page: PageContext) -> ConsentControllerBuilder {
        ConsentControllerBuilder::new(config, page)
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn discovery(&self) -> &DiscoveryLog {
        &self.discovery
    }

    pub fn engine(&self) -> &ActivationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ActivationEngine {
        &mut self.engine
    }

    pub fn alternatives(&self) -> &AlternativeRegistry {
        &self.alternatives
    }

    pub fn tracking_endpoint(&self) -> &Url {
        &self.tracking_endpoint
    }

    /// Current decisions.
    pub fn consents(&self) -> ConsentMap {
        self.store.get()
    }

    /// Change notifications, one per consent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.store.subscribe()
    }

    pub fn visitor_id(&self) -> Result<VisitorId, ConsentError> {
        self.store.visitor_id()
    }

    /// Register the page's tagged elements as deferred items.
    pub fn scan<I>(&mut self, elements: I) -> Result<usize, ConsentError>
    where
        I: IntoIterator<Item = (ElementId, Element)>,
    {
        self.engine.scan(elements)
    }

    /// Turn discovery recording on or off. Turning it off drops the log.
    pub fn set_discovery_mode(&self, enabled: bool) -> Result<(), ConsentError> {
        if enabled {
            self.discovery.enable()
        } else {
            self.discovery.disable()
        }
    }

    /// Enabled categories without a stored decision.
    pub fn missing_decisions(&self) -> BTreeSet<CategoryKey> {
        let consents = self.store.get();
        self.config
            .enabled
            .iter()
            .filter(|key| !consents.is_decided(key.as_str()))
            .cloned()
            .collect()
    }

    /// Whether the selector should open on page load.
    pub fn should_show_selector(&self) -> bool {
        !self.config.hide_on_start && !self.missing_decisions().is_empty()
    }

    /// Checkbox state for every enabled category when the selector opens.
    pub fn initial_selection(&self) -> ConsentMap {
        let consents = self.store.get();
        self.config
            .enabled
            .iter()
            .map(|key| {
                let checked = match consents.get(key.as_str()) {
                    Some(allow) => allow,
                    None => self.config.checked_by_default,
                };
                (key.clone(), checked)
            })
            .collect()
    }

    /// Whether `key` is allowed. Undecided is not allowed.
    pub fn has_consent(&self, key: &str) -> bool {
        self.config.force_allow || self.store.get().is_allowed(key)
    }

    /// Like [`has_consent`](Self::has_consent), and run `on_granted` once
    /// `key` is allowed: immediately if it already is, otherwise when a
    /// later decision allows it.
    pub fn has_consent_with<F>(&mut self, key: impl Into<CategoryKey>, on_granted: F) -> bool
    where
        F: FnOnce(&CategoryKey) + Send + 'static,
    {
        let key = key.into();
        if self.has_consent(key.as_str()) {
            on_granted(&key);
            return true;
        }
        self.granted.entry(key).or_default().push(Box::new(on_granted));
        false
    }

    /// Run `callback` once `key`'s deferred items are live.
    pub fn on_activated<F>(&mut self, key: impl Into<CategoryKey>, callback: F)
    where
        F: FnOnce(&CategoryKey) + Send + 'static,
    {
        self.engine.on_activated(key, callback);
    }

    /// Add an observer for consent beacon outcomes.
    pub fn on_track(&mut self, observer: TrackObserver) {
        self.track_observers.push(observer);
    }

    /// Replace every decision with `decisions`, report them, then activate
    /// allowed categories and run fallbacks for the rest.
    ///
    /// Activation waits for the beacon's response; a failed beacon is
    /// logged and does not block it.
    pub async fn apply_decisions(&mut self, decisions: ConsentMap) -> Result<DecisionReport, ConsentError> {
        self.store.set(&decisions)?;
        tracing::debug!(consents = %decisions, "decisions applied");

        let _ = self.track(&decisions).await;

        self.fire_granted(&decisions);
        self.activate(&decisions)
    }

    /// Set one decision, leaving the others untouched.
    pub async fn decide(
        &mut self,
        key: impl Into<CategoryKey>,
        allow: bool,
        suppress_tracking: bool,
    ) -> Result<(), ConsentError> {
        let key = key.into();
        let mut consents = self.store.get();
        consents.insert(key.clone(), allow);
        self.store.set(&consents)?;
        tracing::debug!(category = %key, allow, "decision set");

        if !suppress_tracking {
            let _ = self.track(&consents).await;
        }

        if allow {
            self.fire_granted(&ConsentMap::from([(key, true)]));
        }
        Ok(())
    }

    /// Allow every enabled category.
    pub async fn accept_all(&mut self) -> Result<DecisionReport, ConsentError> {
        let decisions = self.config.enabled.iter().map(|key| (key.clone(), true)).collect();
        self.apply_decisions(decisions).await
    }

    /// Decline every enabled category except the necessary ones.
    pub async fn reject_all(&mut self) -> Result<DecisionReport, ConsentError> {
        let decisions = self
            .config
            .enabled
            .iter()
            .map(|key| (key.clone(), self.config.is_necessary(key.as_str())))
            .collect();
        self.apply_decisions(decisions).await
    }

    /// Activate what stored decisions allow, run fallbacks for the rest.
    ///
    /// Called once at page load, after [`scan`](Self::scan).
    pub fn activate_consented(&mut self) -> Result<DecisionReport, ConsentError> {
        let consents = self.store.get();
        let enabled: ConsentMap = self
            .config
            .enabled
            .iter()
            .filter_map(|key| consents.get(key.as_str()).map(|allow| (key.clone(), allow)))
            .collect();
        self.activate(&enabled)
    }

    /// Drop every decision. The visitor id is kept.
    pub fn clear(&self) -> Result<(), ConsentError> {
        self.store.clear()
    }

    /// Report `consents` to the logging endpoint and wait for the response.
    pub async fn track(&self, consents: &ConsentMap) -> Result<BeaconResponse, ConsentError> {
        let result = match self.store.visitor_id() {
            Ok(visitor) => {
                let url = consent_beacon_url(&self.tracking_endpoint, &visitor, consents);
                self.transport.send(BeaconRequest::get(url)).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(response) => tracing::debug!(status = %response.status, "consent tracked"),
            Err(e) => tracing::warn!(error = %e, "consent tracking failed"),
        }

        for observer in &self.track_observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&result))).is_err() {
                tracing::error!("track observer panicked");
            }
        }

        result
    }

    fn activate(&mut self, consents: &ConsentMap) -> Result<DecisionReport, ConsentError> {
        let mut report = DecisionReport::default();

        for key in consents.allowed() {
            report.activations.push(self.engine.activate_category(key)?);
        }

        for key in &self.config.enabled {
            match self.alternatives.invoke_if_declined(key.as_str(), consents) {
                Ok(true) => report.fallbacks.push(key.clone()),
                Ok(false) => {}
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => tracing::warn!(category = %key, error = %e, "fallback failed"),
            }
        }

        Ok(report)
    }

    fn fire_granted(&mut self, consents: &ConsentMap) {
        for key in consents.allowed() {
            let Some(callbacks) = self.granted.remove(key) else {
                continue;
            };
            for callback in callbacks {
                callback(key);
            }
        }
    }
}

impl std::fmt::Debug for ConsentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentController")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("alternatives", &self.alternatives)
            .field("tracking_endpoint", &self.tracking_endpoint.as_str())
            .finish()
    }
}

/// Builder for [`ConsentController`].
///
/// Storage defaults to [`MemoryStore`], the document to an empty
/// [`MemoryDocument`] and the transport to [`HttpTransport`].
pub struct ConsentControllerBuilder {
    config: PageConfig,
    page: PageContext,
    storage: Option<Arc<dyn KeyValueStore>>,
    document: Option<Box<dyn Document>>,
    transport: Option<Arc<dyn BeaconTransport>>,
    execution: Option<Box<dyn ScriptExecution>>,
    handlers: HandlerTable,
    alternative_handlers: AlternativeHandlers,
    observers: Vec<ActivationObserver>,
    track_observers: Vec<TrackObserver>,
    tracking_path: String,
}

impl ConsentControllerBuilder {
    fn new(config: PageConfig, page: PageContext) -> Self {
        Self {
            config,
            page,
            storage: None,
            document: None,
            transport: None,
            execution: None,
            handlers: HandlerTable::with_defaults(),
            alternative_handlers: AlternativeHandlers::new(),
            observers: Vec::new(),
            track_observers: Vec::new(),
            tracking_path: DEFAULT_TRACKING_PATH.to_string(),
        }
    }

    /// Set the durable key-value store.
    pub fn storage(mut self, storage: impl KeyValueStore + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Set the host document.
    pub fn document(mut self, document: impl Document + 'static) -> Self {
        self.document = Some(Box::new(document));
        self
    }

    /// Set the beacon transport.
    pub fn transport(mut self, transport: impl BeaconTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the inline script strategy.
    pub fn script_execution(mut self, execution: impl ScriptExecution + 'static) -> Self {
        self.execution = Some(Box::new(execution));
        self
    }

    /// Add a named embed handler.
    pub fn embed_handler(mut self, name: impl Into<String>, handler: impl EmbedHandler + 'static) -> Self {
        self.handlers.register(name, handler);
        self
    }

    /// Add a named fallback handler.
    pub fn alternative_handler(
        mut self,
        name: impl Into<String>,
        handler: impl AlternativeHandler + 'static,
    ) -> Self {
        self.alternative_handlers.register(name, handler);
        self
    }

    /// Add an observer run before every category activation.
    pub fn on_activate(mut self, observer: ActivationObserver) -> Self {
        self.observers.push(observer);
        self
    }

    /// Add an observer for consent beacon outcomes.
    pub fn on_track(mut self, observer: TrackObserver) -> Self {
        self.track_observers.push(observer);
        self
    }

    /// Path of the logging endpoint, resolved against the page URL.
    pub fn tracking_path(mut self, path: impl Into<String>) -> Self {
        self.tracking_path = path.into();
        self
    }

    /// Build the controller.
    ///
    /// Fails on malformed fallback bindings or bindings naming an unknown
    /// handler.
    pub fn build(self) -> Result<ConsentController, ConsentError> {
        let storage: Arc<dyn KeyValueStore> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStore::new()),
        };
        let transport: Arc<dyn BeaconTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?.with_user_agent(self.page.user_agent())),
        };
        let document: Box<dyn Document> = match self.document {
            Some(document) => document,
            None => Box::new(MemoryDocument::new()),
        };

        let mut alternative_handlers = self.alternative_handlers;
        if !alternative_handlers.contains(ANALYTICS_HANDLER) {
            alternative_handlers.register(
                ANALYTICS_HANDLER,
                AnalyticsPageview::new(Arc::clone(&transport), self.page.clone())?,
            );
        }
        let alternatives = match &self.config.alternatives {
            Some(encoded) => AlternativeRegistry::from_encoded(alternative_handlers, encoded)?,
            None => AlternativeRegistry::new(alternative_handlers, BTreeMap::new())?,
        };

        let store = ConsentStore::new(Arc::clone(&storage));
        let discovery = DiscoveryLog::new(storage);

        let mut engine = ActivationEngine::new(document)
            .with_registry(ItemRegistry::with_discovery(discovery.clone()))
            .with_handlers(self.handlers)
            .with_observers(self.observers);
        if let Some(execution) = self.execution {
            engine = engine.with_execution(execution);
        }

        let tracking_endpoint = self.page.resolve(&self.tracking_path)?;

        tracing::debug!(
            enabled = self.config.enabled.len(),
            fallbacks = alternatives.len(),
            endpoint = %tracking_endpoint,
            "consent controller ready"
        );

        Ok(ConsentController {
            config: self.config,
            store,
            discovery,
            engine,
            alternatives,
            transport,
            tracking_endpoint,
            track_observers: self.track_observers,
            granted: HashMap::new(),
        })
    }
}

impl std::fmt::Debug for ConsentControllerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentControllerBuilder")
            .field("config", &self.config)
            .field("page", &self.page)
            .field("handlers", &self.handlers)
            .field("alternative_handlers", &self.alternative_handlers)
            .field("tracking_path", &self.tracking_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Sending;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unreachable;

    impl BeaconTransport for Unreachable {
        fn send(&self, _request: BeaconRequest) -> Sending {
            Box::pin(async { Err(ConsentError::beacon_failed("unreachable")) })
        }
    }

    fn controller(config: PageConfig) -> ConsentController {
        ConsentController::builder(config, PageContext::parse("https://shop.example/").unwrap())
            .transport(Unreachable)
            .build()
            .unwrap()
    }

    #[test]
    fn test_initial_selection() {
        let ctl = controller(PageConfig::new(["video", "stats", "maps"]).with_checked_by_default(true));
        ctl.store()
            .set(&ConsentMap::from([("stats", false), ("video", true)]))
            .unwrap();

        let selection = ctl.initial_selection();
        assert_eq!(selection.get("video"), Some(true));
        assert_eq!(selection.get("stats"), Some(false));
        assert_eq!(selection.get("maps"), Some(true));
    }

    #[test]
    fn test_selector_visibility() {
        let ctl = controller(PageConfig::new(["video"]));
        assert!(ctl.should_show_selector());

        let hidden = controller(PageConfig::new(["video"]).with_hide_on_start(true));
        assert!(!hidden.should_show_selector());

        ctl.store().set(&ConsentMap::from([("video", false)])).unwrap();
        assert!(!ctl.should_show_selector());
    }

    #[test]
    fn test_force_allow() {
        let mut ctl = controller(PageConfig::new(["video"]).with_force_allow(true));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);

        assert!(ctl.has_consent_with("video", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_granted_callback_fires_on_decide() {
        let mut ctl = controller(PageConfig::new(["maps"]));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);

        assert!(!ctl.has_consent_with("maps", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        ctl.decide("maps", false, true).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        ctl.decide("maps", true, true).await.unwrap();
        ctl.decide("maps", true, true).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_fallback_handler_fails_build() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(r#"{"stats":["nope",[]]}"#);
        let result = ConsentController::builder(
            PageConfig::new(["stats"]).with_alternatives(encoded),
            PageContext::parse("https://shop.example/").unwrap(),
        )
        .transport(Unreachable)
        .build();

        assert!(matches!(result, Err(ConsentError::UnknownAlternative { .. })));
    }

    #[test]
    fn test_fallback_network_error_does_not_abort_page_load() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(r#"{"stats":["ga",["UA-1-1"]],"chat":["notice",[]]}"#);
        let notices = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notices);

        let mut ctl = ConsentController::builder(
            PageConfig::new(["stats", "chat", "video"]).with_alternatives(encoded),
            PageContext::parse("https://shop.example/").unwrap(),
        )
        .transport(Unreachable)
        .alternative_handler("notice", move |_args: &[serde_json::Value]| -> Result<(), ConsentError> {
            n.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build()
        .unwrap();
        ctl.store()
            .set(&ConsentMap::from([("stats", false), ("chat", false), ("video", true)]))
            .unwrap();

        // No runtime here, so the "ga" pageview cannot be spawned.
        let report = ctl.activate_consented().unwrap();

        assert_eq!(report.activations.len(), 1);
        assert_eq!(report.fallbacks, vec![CategoryKey::from("chat")]);
        assert_eq!(notices.load(Ordering::SeqCst), 1);
    }
}
