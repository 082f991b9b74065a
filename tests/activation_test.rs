//! Deferred item activation against an in-memory document.

use cookiecontrol::activation::engine::ActivationEngine;
use cookiecontrol::activation::handlers::{VIDEO_EMBED_LAZY, VIDEO_EMBED_LAZY_ATTRIBUTE};
use cookiecontrol::activation::item::ItemKind;
use cookiecontrol::activation::registry::ItemRegistry;
use cookiecontrol::activation::script::NativeExecution;
use cookiecontrol::consent::discovery::DiscoveryLog;
use cookiecontrol::dom::{Element, MemoryDocument, HANDLER_ATTRIBUTE, KEY_ATTRIBUTE, SRC_ATTRIBUTE};
use cookiecontrol::storage::MemoryStore;
use cookiecontrol::{CategoryKey, ConsentError};
use std::sync::Arc;

fn tagged(tag: &str, key: &str) -> Element {
    Element::new(tag).with_attribute(KEY_ATTRIBUTE, key)
}

fn page(doc: &MemoryDocument) {
    doc.push(Element::new("h1").with_text("Products"));
    doc.push(tagged("script", "stats").with_attribute(SRC_ATTRIBUTE, "https://stats.example/matomo.js"));
    doc.push(tagged("script", "stats").with_text("_paq.push(['trackPageView']);"));
    doc.push(tagged("iframe", "youtube").with_attribute(SRC_ATTRIBUTE, "https://www.youtube-nocookie.com/embed/x"));
    doc.push(
        tagged("div", "vimeo")
            .with_attribute(HANDLER_ATTRIBUTE, VIDEO_EMBED_LAZY)
            .with_attribute(
                VIDEO_EMBED_LAZY_ATTRIBUTE,
                r#"<iframe src="about:blank" data-consent-src="https://player.vimeo.com/video/7"></iframe>"#,
            ),
    );
    doc.push(tagged("div", "youtube"));
}

#[test]
fn test_scan_groups_by_category() {
    let doc = MemoryDocument::new();
    page(&doc);

    let mut engine = ActivationEngine::new(doc.clone());
    assert_eq!(engine.scan(doc.elements()).unwrap(), 5);

    let registry = engine.registry();
    assert_eq!(registry.pending("stats"), 2);
    assert_eq!(registry.pending("youtube"), 2);
    assert_eq!(registry.pending("vimeo"), 1);

    let mut categories: Vec<&str> = registry.categories().map(CategoryKey::as_str).collect();
    categories.sort();
    assert_eq!(categories, vec!["stats", "vimeo", "youtube"]);
}

#[test]
fn test_items_keep_document_order() {
    let doc = MemoryDocument::new();
    page(&doc);

    let mut registry = ItemRegistry::new();
    registry.scan(doc.elements()).unwrap();

    let kinds: Vec<&'static str> = registry
        .drain("stats")
        .iter()
        .map(|item| item.kind().name())
        .collect();
    assert_eq!(kinds, vec!["script-external", "script-inline"]);

    let items = registry.drain("youtube");
    assert!(matches!(items[0].kind(), ItemKind::Iframe { .. }));
    assert!(matches!(items[1].kind(), ItemKind::Passive));
}

#[test]
fn test_activating_one_category_leaves_others() {
    let doc = MemoryDocument::new();
    page(&doc);
    let mut engine = ActivationEngine::new(doc.clone());
    engine.scan(doc.elements()).unwrap();

    engine.activate_category(&"stats".into()).unwrap();

    assert_eq!(doc.loaded_scripts(), vec!["https://stats.example/matomo.js".to_string()]);
    assert_eq!(doc.executed_scripts(), vec!["_paq.push(['trackPageView']);".to_string()]);
    assert!(engine.is_activated("stats"));
    assert!(!engine.is_activated("youtube"));
    assert_eq!(engine.registry().pending("youtube"), 2);
}

#[test]
fn test_lazy_video_embed() {
    let doc = MemoryDocument::new();
    page(&doc);
    let mut engine = ActivationEngine::new(doc.clone());
    engine.scan(doc.elements()).unwrap();

    engine.activate_category(&"vimeo".into()).unwrap();

    let embed = doc
        .elements()
        .into_iter()
        .map(|(_, el)| el)
        .find(|el| el.has_attribute(VIDEO_EMBED_LAZY_ATTRIBUTE))
        .unwrap();
    assert_eq!(
        embed.attribute(VIDEO_EMBED_LAZY_ATTRIBUTE),
        Some(r#"<iframe src="https://player.vimeo.com/video/7"></iframe>"#)
    );
}

#[test]
fn test_native_execution_on_native_host() {
    let doc = MemoryDocument::new();
    doc.push(tagged("script", "chat").with_text("chat.boot();"));

    let mut engine = ActivationEngine::new(doc.clone()).with_execution(NativeExecution);
    engine.scan(doc.elements()).unwrap();
    engine.activate_category(&"chat".into()).unwrap();
    engine.activate_category(&"chat".into()).unwrap();

    assert_eq!(doc.executed_scripts(), vec!["chat.boot();".to_string()]);
}

#[test]
fn test_shim_on_host_without_reinsertion() {
    let doc = MemoryDocument::with_native_inline(false);
    doc.push(tagged("script", "chat").with_text("chat.boot();"));

    let mut engine = ActivationEngine::new(doc.clone());
    engine.scan(doc.elements()).unwrap();
    engine.activate_category(&"chat".into()).unwrap();

    assert_eq!(doc.executed_scripts(), vec!["chat.boot();".to_string()]);
}

#[test]
fn test_iframe_without_source_is_rejected() {
    let doc = MemoryDocument::new();
    doc.push(tagged("iframe", "youtube"));

    let mut engine = ActivationEngine::new(doc.clone());
    let err = engine.scan(doc.elements()).unwrap_err();
    assert_eq!(
        err,
        ConsentError::RejectedItems {
            registered: 0,
            rejected: vec![ConsentError::MissingDeferredSource {
                tag: "iframe".to_string()
            }],
        }
    );
}

#[test]
fn test_bad_elements_do_not_hide_later_items() {
    let doc = MemoryDocument::new();
    doc.push(tagged("object", "flash"));
    doc.push(tagged("div", "maps").with_attribute(HANDLER_ATTRIBUTE, "noSuchHandler"));
    let frame = doc.push(tagged("iframe", "video").with_attribute(SRC_ATTRIBUTE, "https://v.example/embed/1"));

    let mut engine = ActivationEngine::new(doc.clone());
    let err = engine.scan(doc.elements()).unwrap_err();
    match err {
        ConsentError::RejectedItems { registered, rejected } => {
            assert_eq!(registered, 1);
            assert_eq!(
                rejected,
                vec![
                    ConsentError::UnknownItemKind { tag: "object".into() },
                    ConsentError::unknown_handler("noSuchHandler"),
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    let report = engine.activate_category(&"video".into()).unwrap();
    assert_eq!(report.activated, 1);
    assert_eq!(doc.element(frame).unwrap().attribute("src"), Some("https://v.example/embed/1"));
}

#[test]
fn test_scan_records_discovery() {
    let doc = MemoryDocument::new();
    page(&doc);

    let log = DiscoveryLog::new(Arc::new(MemoryStore::new()));
    log.enable().unwrap();
    let mut registry = ItemRegistry::with_discovery(log.clone());
    registry.scan(doc.elements()).unwrap();

    let expected: Vec<CategoryKey> = vec!["stats".into(), "youtube".into(), "vimeo".into()];
    assert_eq!(log.read(), Some(expected));
}
