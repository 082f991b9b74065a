//! Consent persistence across storage backends.

use cookiecontrol::consent::discovery::DiscoveryLog;
use cookiecontrol::consent::store::{ConsentStore, CONSENT_MAP_KEY, VISITOR_ID_KEY};
use cookiecontrol::storage::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore};
use cookiecontrol::{CategoryKey, ConsentMap};
use std::sync::Arc;
use tempfile::tempdir;

fn exercise(backend: Arc<dyn KeyValueStore>) {
    let store = ConsentStore::new(Arc::clone(&backend));
    assert!(store.get().is_empty());

    let decisions = ConsentMap::from([("video", true), ("stats", false)]);
    store.set(&decisions).unwrap();
    assert_eq!(store.get(), decisions);

    let visitor = store.visitor_id().unwrap();
    store.clear().unwrap();
    assert!(store.get().is_empty());
    assert_eq!(backend.get(CONSENT_MAP_KEY).unwrap(), None);
    assert_eq!(store.visitor_id().unwrap(), visitor);
}

#[test]
fn test_memory_backend() {
    exercise(Arc::new(MemoryStore::new()));
}

#[test]
fn test_json_file_backend() {
    let dir = tempdir().unwrap();
    exercise(Arc::new(JsonFileStore::open(dir.path().join("storage.json")).unwrap()));
}

#[test]
fn test_sqlite_backend() {
    let dir = tempdir().unwrap();
    exercise(Arc::new(SqliteStore::open(dir.path().join("storage.db")).unwrap()));
}

#[test]
fn test_decisions_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.db");
    let decisions = ConsentMap::from([("maps", true)]);

    let visitor = {
        let store = ConsentStore::new(Arc::new(SqliteStore::open(&path).unwrap()));
        store.set(&decisions).unwrap();
        store.visitor_id().unwrap()
    };

    let store = ConsentStore::new(Arc::new(SqliteStore::open(&path).unwrap()));
    assert_eq!(store.get(), decisions);
    assert_eq!(store.visitor_id().unwrap(), visitor);
}

#[test]
fn test_json_file_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let backend = JsonFileStore::open(&path).unwrap();
        backend.set(VISITOR_ID_KEY, "1700000000000-abc-def-gh").unwrap();
    }

    let backend = JsonFileStore::open(&path).unwrap();
    assert_eq!(
        backend.get(VISITOR_ID_KEY).unwrap().as_deref(),
        Some("1700000000000-abc-def-gh")
    );
}

#[test]
fn test_corrupt_record_reads_as_undecided() {
    let backend = Arc::new(MemoryStore::new());
    backend.set(CONSENT_MAP_KEY, "{\"video\": \"yes\"").unwrap();

    let store = ConsentStore::new(backend.clone());
    assert!(store.get().is_empty());

    backend.set(CONSENT_MAP_KEY, "null").unwrap();
    assert!(store.get().is_empty());
}

#[test]
fn test_discovery_log_on_disk() {
    let dir = tempdir().unwrap();
    let backend: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(dir.path().join("storage.json")).unwrap());
    let log = DiscoveryLog::new(backend);

    log.record(&CategoryKey::from("video")).unwrap();
    assert_eq!(log.read(), None);

    log.enable().unwrap();
    log.record(&CategoryKey::from("video")).unwrap();
    log.record(&CategoryKey::from("maps")).unwrap();
    log.record(&CategoryKey::from("video")).unwrap();

    let expected: Vec<CategoryKey> = vec!["video".into(), "maps".into()];
    assert_eq!(log.read(), Some(expected));

    log.disable().unwrap();
    assert_eq!(log.read(), None);
}
