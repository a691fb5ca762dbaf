//! The cached region registry.
//!
//! Holds an in-memory snapshot of every known region so token verification
//! never waits on the store in the common case. The snapshot is an
//! `Arc<HashMap>` behind an [`RwLock`]: readers clone the `Arc` and work on
//! an immutable map, writers build a replacement map and swap it in.
//!
//! Two paths keep the snapshot current:
//!
//! - a bulk refresh from the operator seed list (run at startup and then
//!   periodically via [`RegionRegistry::spawn_seed_refresh`]), and
//! - a lazy single-region fetch when a lookup misses or the cached entry has
//!   gone stale.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use parking_lot::RwLock;
use relaymesh_storage::{RegionRecord, RegionStore, Zeroizing};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{RegistryError, RegistryResult},
    seed::RegionSeed,
};

/// Default window within which a cached entry is served without a re-fetch.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Default persisted lifetime of a region document.
pub const DEFAULT_RECORD_TTL: chrono::Duration = chrono::Duration::hours(48);

#[derive(Clone, Debug)]
struct CachedRegion {
    record: RegionRecord,
    fetched_at: Instant,
}

/// Cached name → region lookup over a [`RegionStore`].
pub struct RegionRegistry {
    store: Arc<dyn RegionStore>,
    cache: RwLock<Arc<HashMap<String, CachedRegion>>>,
    staleness_window: Duration,
    record_ttl: chrono::Duration,
}

impl RegionRegistry {
    /// Creates a registry with an empty cache and default timing
    /// ([`DEFAULT_STALENESS_WINDOW`], [`DEFAULT_RECORD_TTL`]).
    #[must_use]
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Arc::new(HashMap::new())),
            staleness_window: DEFAULT_STALENESS_WINDOW,
            record_ttl: DEFAULT_RECORD_TTL,
        }
    }

    /// Overrides how long a cached entry is served without a re-fetch.
    #[must_use]
    pub fn with_staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = window;
        self
    }

    /// Overrides the persisted `expire_at` horizon stamped on refresh.
    #[must_use]
    pub fn with_record_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Re-asserts every seeded region in the store and swaps in a complete
    /// new cache snapshot.
    ///
    /// A per-region store failure is logged and skipped; the region still
    /// lands in the new snapshot so verification keeps working from the
    /// authoritative seed while the store recovers.
    #[tracing::instrument(skip(self, seeds), fields(seed_count = seeds.len()))]
    pub async fn refresh_all(&self, seeds: &[RegionSeed]) {
        let now = Instant::now();
        let mut next = HashMap::with_capacity(seeds.len());

        for seed in seeds {
            let record = RegionRecord::builder()
                .name(seed.name.clone())
                .secret(seed.secret.clone())
                .maybe_ip_filter(seed.ip_filter.clone())
                .geo_positions(seed.geo_positions.clone())
                .expire_at(Utc::now() + self.record_ttl)
                .build();

            if let Err(error) = self.store.upsert_region(&record).await {
                tracing::warn!(region = %seed.name, %error, "region upsert failed, caching seed anyway");
            }
            next.insert(seed.name.clone(), CachedRegion { record, fetched_at: now });
        }

        *self.cache.write() = Arc::new(next);
        tracing::info!(regions = seeds.len(), "region cache refreshed");
    }

    /// Fetches a single region from the store and folds it into the cache.
    ///
    /// The cache is only touched on a successful read that found the region;
    /// an absent region or a store failure leaves the snapshot as it was
    /// (absence is never cached).
    ///
    /// # Errors
    ///
    /// Propagates store failures as [`RegistryError::Storage`].
    #[tracing::instrument(skip(self))]
    pub async fn fetch_one(&self, name: &str) -> RegistryResult<Option<RegionRecord>> {
        let Some(record) = self.store.get_region(name).await? else {
            return Ok(None);
        };

        let mut next: HashMap<String, CachedRegion> = (**self.cache.read()).clone();
        next.insert(
            name.to_owned(),
            CachedRegion { record: record.clone(), fetched_at: Instant::now() },
        );
        *self.cache.write() = Arc::new(next);

        Ok(Some(record))
    }

    /// Resolves the signing secret for a region name.
    ///
    /// Serves straight from the cache while the entry is within the
    /// staleness window. On a miss or a stale entry it makes exactly one
    /// fetch attempt; only when that attempt succeeds but finds nothing does
    /// a still-cached (stale) secret get served, covering the gap between a
    /// store-side document expiry and the next seed cycle.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownRegion`] if the region is neither
    /// cached nor in the store, and [`RegistryError::Storage`] when the
    /// fetch attempt itself fails.
    pub async fn resolve_secret(&self, name: &str) -> RegistryResult<Zeroizing<Vec<u8>>> {
        let snapshot = self.cache.read().clone();
        if let Some(entry) = snapshot.get(name)
            && entry.fetched_at.elapsed() < self.staleness_window
        {
            return Ok(entry.record.secret.clone());
        }

        if let Some(record) = self.fetch_one(name).await? {
            return Ok(record.secret);
        }

        let snapshot = self.cache.read().clone();
        match snapshot.get(name) {
            Some(entry) => Ok(entry.record.secret.clone()),
            None => Err(RegistryError::unknown_region(name)),
        }
    }

    /// Spawns the periodic bulk-refresh task (24 h period in production).
    ///
    /// The first refresh runs immediately, so calling this at startup also
    /// performs the initial seeding. Stop the task with
    /// [`SeedRefreshHandle::shutdown`].
    #[must_use]
    pub fn spawn_seed_refresh(
        self: &Arc<Self>,
        seeds: Vec<RegionSeed>,
        period: Duration,
    ) -> SeedRefreshHandle {
        let registry = Arc::clone(self);
        let cancel = CancellationToken::new();
        let child = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    _ = ticker.tick() => registry.refresh_all(&seeds).await,
                }
            }
            tracing::debug!("seed refresh task stopped");
        });

        SeedRefreshHandle { cancel, handle }
    }
}

impl std::fmt::Debug for RegionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry")
            .field("cached_regions", &self.cache.read().len())
            .field("staleness_window", &self.staleness_window)
            .field("record_ttl", &self.record_ttl)
            .finish_non_exhaustive()
    }
}

/// Handle to a running seed-refresh task.
#[derive(Debug)]
pub struct SeedRefreshHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SeedRefreshHandle {
    /// Cancels the refresh loop and waits for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use relaymesh_storage::{
        MemoryRegionStore, StorageError, StorageResult, UpsertOutcome, testutil::make_region,
    };

    use super::*;

    fn seeds(entries: &[&str]) -> Vec<RegionSeed> {
        entries.iter().map(|entry| RegionSeed::parse(entry).expect("seed")).collect()
    }

    /// Store wrapper that counts reads and can be switched to fail them.
    struct InstrumentedStore {
        inner: MemoryRegionStore,
        gets: AtomicUsize,
        fail_gets: AtomicBool,
    }

    impl InstrumentedStore {
        fn new(inner: MemoryRegionStore) -> Self {
            Self { inner, gets: AtomicUsize::new(0), fail_gets: AtomicBool::new(false) }
        }
    }

    #[async_trait]
    impl RegionStore for InstrumentedStore {
        async fn upsert_region(&self, record: &RegionRecord) -> StorageResult<UpsertOutcome> {
            self.inner.upsert_region(record).await
        }

        async fn get_region(&self, name: &str) -> StorageResult<Option<RegionRecord>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail_gets.load(Ordering::SeqCst) {
                return Err(StorageError::connection("store down"));
            }
            self.inner.get_region(name).await
        }
    }

    #[tokio::test]
    async fn test_refresh_all_persists_and_caches() {
        let store = Arc::new(MemoryRegionStore::new());
        let registry = RegionRegistry::new(store.clone());

        registry.refresh_all(&seeds(&["eu|c2VjcmV0|1.2.3.0/24|48.1,11.5", "us|b3RoZXI="])).await;

        let stored = store.get_region("eu").await.expect("get").expect("persisted");
        assert_eq!(&**stored.secret, b"secret");
        assert_eq!(stored.ip_filter, Some(vec!["1.2.3.0/24".to_owned()]));
        assert!(stored.expire_at > Utc::now() + chrono::Duration::hours(47));

        // Both regions resolvable from cache alone.
        let secret = registry.resolve_secret("us").await.expect("resolve");
        assert_eq!(&**secret, b"other");
    }

    #[tokio::test]
    async fn test_refresh_replaces_previous_snapshot() {
        let store = Arc::new(MemoryRegionStore::new());
        let registry = RegionRegistry::new(store);

        registry.refresh_all(&seeds(&["eu|c2VjcmV0"])).await;
        registry.refresh_all(&seeds(&["us|b3RoZXI="])).await;

        // "eu" left the cache with the swap but is still persisted, so it
        // resolves via the lazy fetch path rather than the snapshot.
        assert!(registry.resolve_secret("us").await.is_ok());
        assert!(registry.resolve_secret("eu").await.is_ok());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_store() {
        let store =
            Arc::new(InstrumentedStore::new(MemoryRegionStore::new()));
        let registry = RegionRegistry::new(store.clone());
        registry.refresh_all(&seeds(&["eu|c2VjcmV0"])).await;

        for _ in 0..5 {
            registry.resolve_secret("eu").await.expect("resolve");
        }
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_makes_exactly_one_fetch() {
        let store = Arc::new(InstrumentedStore::new(MemoryRegionStore::new()));
        let registry =
            RegionRegistry::new(store.clone()).with_staleness_window(Duration::ZERO);
        registry.refresh_all(&seeds(&["eu|c2VjcmV0"])).await;

        registry.resolve_secret("eu").await.expect("resolve");
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);

        registry.resolve_secret("eu").await.expect("resolve");
        assert_eq!(store.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_from_store() {
        let backing = MemoryRegionStore::new();
        backing.upsert_region(&make_region("lazy")).await.expect("seed store");
        let registry = RegionRegistry::new(Arc::new(backing));

        let secret = registry.resolve_secret("lazy").await.expect("resolve");
        assert_eq!(&**secret, b"secret-lazy");
    }

    #[tokio::test]
    async fn test_unknown_region() {
        let registry = RegionRegistry::new(Arc::new(MemoryRegionStore::new()));
        let err = registry.resolve_secret("nowhere").await.expect_err("unknown");
        assert!(matches!(err, RegistryError::UnknownRegion { name } if name == "nowhere"));
    }

    #[tokio::test]
    async fn test_store_failure_on_stale_entry_is_an_error() {
        let store = Arc::new(InstrumentedStore::new(MemoryRegionStore::new()));
        let registry =
            RegionRegistry::new(store.clone()).with_staleness_window(Duration::ZERO);
        registry.refresh_all(&seeds(&["eu|c2VjcmV0"])).await;

        // The entry is stale, so the one fetch attempt runs and fails; the
        // failure must reach the caller instead of reviving the stale secret.
        store.fail_gets.store(true, Ordering::SeqCst);
        let err = registry.resolve_secret("eu").await.expect_err("store error");
        assert!(matches!(err, RegistryError::Storage(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_store_side_expiry_falls_back_to_stale_cache() {
        let store = MemoryRegionStore::new();
        let registry = RegionRegistry::new(Arc::new(store.clone()))
            .with_staleness_window(Duration::ZERO);
        registry.refresh_all(&seeds(&["eu|c2VjcmV0"])).await;

        // Document aged out of the store; the fetch succeeds but finds
        // nothing, and the cached secret bridges until the next seed cycle.
        store.remove_region("eu");
        let secret = registry.resolve_secret("eu").await.expect("stale fallback");
        assert_eq!(&**secret, b"secret");
    }

    #[tokio::test]
    async fn test_absence_is_not_cached() {
        let backing = MemoryRegionStore::new();
        let store = Arc::new(InstrumentedStore::new(backing.clone()));
        let registry = RegionRegistry::new(store.clone());

        assert!(registry.resolve_secret("late").await.is_err());

        // Region appears later; the earlier miss must not shadow it.
        backing.upsert_region(&make_region("late")).await.expect("seed store");
        assert!(registry.resolve_secret("late").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_one_updates_cache_only_on_hit() {
        let store = Arc::new(InstrumentedStore::new(MemoryRegionStore::new()));
        let registry = RegionRegistry::new(store.clone());

        assert!(registry.fetch_one("ghost").await.expect("fetch").is_none());
        assert!(registry.cache.read().is_empty());
    }

    #[tokio::test]
    async fn test_seed_refresh_task_runs_immediately_and_stops() {
        let store = Arc::new(MemoryRegionStore::new());
        let registry = Arc::new(RegionRegistry::new(store.clone()));

        let handle =
            registry.spawn_seed_refresh(seeds(&["eu|c2VjcmV0"]), Duration::from_secs(3600));

        // First tick fires immediately.
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if store.get_region("eu").await.expect("get").is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("initial refresh must land");

        handle.shutdown().await;
    }
}
