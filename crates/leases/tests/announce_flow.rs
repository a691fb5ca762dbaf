//! End-to-end announce pipeline tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use relaymesh_leases::{AnnounceError, LeaseRegistry, RouterAnnouncement};
use relaymesh_storage::{
    LeaseWrite, MemoryRouterLeaseStore, RouterLease, RouterLeaseStore, StorageError,
    StorageResult, TranslationTable, UpsertOutcome, testutil::store_with_table,
};

const URL: &str = "https://node.example/";

fn announcement(clients: Option<Vec<&str>>) -> RouterAnnouncement {
    serde_json::from_value(serde_json::json!({
        "url": URL,
        "wsUrl": "wss://node.example/ws",
        "spki": "MIIBIjANBg",
        "numClients": 3,
        "maxClients": 100,
        "numRealms": 1,
        "maxRealms": 10,
        "clients": clients.clone().unwrap_or_default(),
        "primaryRealms": clients.unwrap_or_default(),
    }))
    .expect("announcement json")
}

/// Store wrapper that can script the upsert outcome and fail selected
/// operations, while recording issued salts.
struct ScriptedStore {
    inner: MemoryRouterLeaseStore,
    upsert_outcome: Mutex<Option<UpsertOutcome>>,
    salt_outcome: Mutex<Option<UpsertOutcome>>,
    fail_table: AtomicBool,
    fail_salt: AtomicBool,
    salts: Mutex<Vec<String>>,
}

impl ScriptedStore {
    fn new() -> Self {
        Self {
            inner: MemoryRouterLeaseStore::new(),
            upsert_outcome: Mutex::new(None),
            salt_outcome: Mutex::new(None),
            fail_table: AtomicBool::new(false),
            fail_salt: AtomicBool::new(false),
            salts: Mutex::new(Vec::new()),
        }
    }

    fn script_upsert(&self, outcome: UpsertOutcome) {
        *self.upsert_outcome.lock().expect("lock") = Some(outcome);
    }

    fn script_salt(&self, outcome: UpsertOutcome) {
        *self.salt_outcome.lock().expect("lock") = Some(outcome);
    }
}

#[async_trait]
impl RouterLeaseStore for ScriptedStore {
    async fn upsert_lease(&self, write: &LeaseWrite) -> StorageResult<UpsertOutcome> {
        let real = self.inner.upsert_lease(write).await?;
        Ok(self.upsert_outcome.lock().expect("lock").unwrap_or(real))
    }

    async fn get_lease(&self, url: &str) -> StorageResult<Option<RouterLease>> {
        self.inner.get_lease(url).await
    }

    async fn get_translation_table(&self, url: &str) -> StorageResult<Option<TranslationTable>> {
        if self.fail_table.load(Ordering::SeqCst) {
            return Err(StorageError::timeout());
        }
        self.inner.get_translation_table(url).await
    }

    async fn set_translation_table(&self, url: &str, table: TranslationTable) -> StorageResult<()> {
        self.inner.set_translation_table(url, table).await
    }

    async fn set_hash_salt(&self, url: &str, salt: &str) -> StorageResult<UpsertOutcome> {
        if self.fail_salt.load(Ordering::SeqCst) {
            return Err(StorageError::connection("store down"));
        }
        self.salts.lock().expect("lock").push(salt.to_owned());
        let real = self.inner.set_hash_salt(url, salt).await?;
        Ok(self.salt_outcome.lock().expect("lock").unwrap_or(real))
    }
}

// ========== Happy path ==========

#[tokio::test]
async fn announce_stamps_region_from_caller_not_body() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    let mut body = announcement(None);
    body.region = Some("forged".to_owned());
    registry.announce(body, "eu").await.expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert_eq!(lease.region, "eu");
    assert!(lease.hash_salt.is_none());
}

#[tokio::test]
async fn announce_stamps_short_expiry() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    let before = Utc::now();
    registry.announce(announcement(None), "eu").await.expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert!(lease.expire_at > before);
    assert!(lease.expire_at <= Utc::now() + Duration::seconds(30));
}

#[tokio::test]
async fn re_announce_refreshes_in_place() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(None), "eu").await.expect("first");

    let mut refresh = announcement(None);
    refresh.num_clients = 42;
    registry.announce(refresh, "eu").await.expect("second");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert_eq!(lease.num_clients, 42);
    assert!(lease.hash_salt.is_none(), "no race, no salt");
}

#[tokio::test]
async fn announce_normalizes_lease_key() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    let mut body = announcement(None);
    body.url = "https://node.example".to_owned();
    registry.announce(body, "eu").await.expect("announce");

    assert!(store.get_lease(URL).await.expect("get").is_some());
}

#[tokio::test]
async fn custom_lease_duration_is_applied() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone()).with_lease_duration(Duration::seconds(5));

    registry.announce(announcement(None), "eu").await.expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert!(lease.expire_at <= Utc::now() + Duration::seconds(5));
}

// ========== Translation ==========

#[tokio::test]
async fn compound_identifiers_translate_all_or_drop() {
    let store = Arc::new(store_with_table(URL, &[("a", "x"), ("b", "y")]).await);
    let registry = LeaseRegistry::new(store.clone());

    registry
        .announce(announcement(Some(vec!["a:b", "a:zz"])), "eu")
        .await
        .expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    // "a:b" resolves fully, "a:zz" has an unresolvable component.
    assert_eq!(lease.clients, Some(vec!["x:y".to_owned()]));
    assert_eq!(lease.primary_realms, Some(vec!["x:y".to_owned()]));
}

#[tokio::test]
async fn missing_table_drops_both_lists_silently() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(Some(vec!["a:b"])), "eu").await.expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert!(lease.clients.is_none());
    assert!(lease.primary_realms.is_none());
}

#[tokio::test]
async fn empty_table_drops_both_lists_silently() {
    let store = Arc::new(store_with_table(URL, &[]).await);
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(Some(vec!["a"])), "eu").await.expect("announce");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert!(lease.clients.is_none());
}

#[tokio::test]
async fn dropped_lists_keep_previously_stored_values() {
    let store = Arc::new(store_with_table(URL, &[("a", "x")]).await);
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(Some(vec!["a"])), "eu").await.expect("first");

    // Table disappears between announcements.
    store.set_translation_table(URL, TranslationTable::default()).await.expect("clear");
    registry.announce(announcement(Some(vec!["a"])), "eu").await.expect("second");

    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert_eq!(lease.clients, Some(vec!["x".to_owned()]), "old translation survives");
}

#[tokio::test]
async fn table_lookup_failure_abandons_announcement() {
    let store = Arc::new(ScriptedStore::new());
    store.fail_table.store(true, Ordering::SeqCst);
    let registry = LeaseRegistry::new(store.clone());

    let err = registry
        .announce(announcement(Some(vec!["a"])), "eu")
        .await
        .expect_err("must abandon");
    assert!(matches!(err, AnnounceError::Storage(_)));
    assert!(store.get_lease(URL).await.expect("get").is_none(), "no partial write");
}

// ========== Validation ==========

#[tokio::test]
async fn malformed_body_never_reaches_the_store() {
    let store = Arc::new(MemoryRouterLeaseStore::new());
    let registry = LeaseRegistry::new(store.clone());

    let mut body = announcement(None);
    body.spki = String::new();
    let err = registry.announce(body, "eu").await.expect_err("must reject");
    assert!(matches!(err, AnnounceError::MalformedRequest { field: "spki", .. }));
    assert!(store.get_lease(URL).await.expect("get").is_none());
}

// ========== Race detection ==========

#[tokio::test]
async fn double_create_race_issues_salt() {
    let store = Arc::new(ScriptedStore::new());
    store.script_upsert(UpsertOutcome { matched: 0, modified: 0, created: 2 });
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(None), "eu").await.expect("announce");

    let salts = store.salts.lock().expect("lock");
    assert_eq!(salts.len(), 1);
    let raw = STANDARD.decode(&salts[0]).expect("salt is standard base64");
    assert_eq!(raw.len(), 16);

    drop(salts);
    let lease = store.get_lease(URL).await.expect("get").expect("exists");
    assert!(lease.hash_salt.is_some());
}

#[tokio::test]
async fn single_create_issues_no_salt() {
    let store = Arc::new(ScriptedStore::new());
    let registry = LeaseRegistry::new(store.clone());

    registry.announce(announcement(None), "eu").await.expect("announce");

    assert!(store.salts.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn zero_effect_upsert_is_a_storage_error() {
    let store = Arc::new(ScriptedStore::new());
    store.script_upsert(UpsertOutcome { matched: 1, modified: 0, created: 0 });
    let registry = LeaseRegistry::new(store.clone());

    let err = registry.announce(announcement(None), "eu").await.expect_err("must fail");
    assert!(matches!(err, AnnounceError::Storage(_)));
}

#[tokio::test]
async fn no_effect_salt_write_fails_the_announcement() {
    let store = Arc::new(ScriptedStore::new());
    store.script_upsert(UpsertOutcome { matched: 0, modified: 0, created: 2 });
    // The write returns Ok but touched nothing; that is a persistence
    // failure, not a success.
    store.script_salt(UpsertOutcome { matched: 0, modified: 0, created: 0 });
    let registry = LeaseRegistry::new(store.clone());

    let err = registry.announce(announcement(None), "eu").await.expect_err("must fail");
    assert!(matches!(err, AnnounceError::Storage(_)));
}

#[tokio::test]
async fn failed_salt_write_fails_the_announcement() {
    let store = Arc::new(ScriptedStore::new());
    store.script_upsert(UpsertOutcome { matched: 0, modified: 0, created: 2 });
    store.fail_salt.store(true, Ordering::SeqCst);
    let registry = LeaseRegistry::new(store.clone());

    let err = registry.announce(announcement(None), "eu").await.expect_err("must fail");
    assert!(matches!(err, AnnounceError::Storage(_)));
}
