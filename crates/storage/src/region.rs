//! Region documents and their persistence trait.
//!
//! A region is an administrative partition of the platform with its own
//! symmetric signing secret, optional client IP allow-list, and geographic
//! extent. Region documents are keyed by `name` and re-asserted by the
//! seeding job at least once a day; the persisted `expire_at` (now + 48h on
//! every refresh) lets the backing store age out regions that stop being
//! re-asserted.
//!
//! # Usage
//!
//! ```
//! use chrono::{Duration, Utc};
//! use relaymesh_storage::{MemoryRegionStore, RegionRecord, RegionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryRegionStore::new();
//!
//!     let record = RegionRecord::builder()
//!         .name("eu")
//!         .secret(b"secret".to_vec())
//!         .expire_at(Utc::now() + Duration::hours(48))
//!         .build();
//!
//!     store.upsert_region(&record).await?;
//!     assert!(store.get_region("eu").await?.is_some());
//!     Ok(())
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::StorageResult,
    types::{GeoPoint, UpsertOutcome},
};

/// A region document as persisted in the region collection.
///
/// # Invariants
///
/// - `name` is the unique key; the store holds at most one document per name.
/// - `secret` is the symmetric key used to both sign and verify tokens bound
///   to this region. It is wrapped in [`Zeroizing`] so the raw key bytes are
///   scrubbed from memory when the record is dropped.
/// - An absent `ip_filter` means the region accepts clients from anywhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct RegionRecord {
    /// Unique region name, stable key and JWT `kid` value.
    #[builder(into)]
    pub name: String,

    /// Symmetric signing secret for tokens bound to this region.
    #[builder(into)]
    pub secret: Zeroizing<Vec<u8>>,

    /// Allowed client network prefixes; `None` means unrestricted.
    pub ip_filter: Option<Vec<String>>,

    /// Ordered points describing the region's service area.
    #[builder(default)]
    pub geo_positions: Vec<GeoPoint>,

    /// Instant after which the persisted document is eligible for
    /// store-side expiry. Stamped to now + 48h on every refresh, so a
    /// region must be re-asserted at least daily to survive.
    pub expire_at: DateTime<Utc>,
}

/// Persistence operations for region documents.
///
/// Production backends talk to the platform's document store; tests use
/// [`MemoryRegionStore`]. Both expose the same two operations the region
/// registry needs: a keyed read and a set-on-conflict upsert.
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Upserts a region document by `name`.
    ///
    /// Creates the document if absent, replaces its fields if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write times out.
    async fn upsert_region(&self, record: &RegionRecord) -> StorageResult<UpsertOutcome>;

    /// Reads a single region document by `name`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the region exists
    /// - `Ok(None)` if it does not
    /// - `Err(...)` on store errors
    async fn get_region(&self, name: &str) -> StorageResult<Option<RegionRecord>>;
}

/// In-memory implementation of [`RegionStore`] for testing.
///
/// Thread-safe via [`parking_lot::RwLock`]; cloning shares state. Documents
/// are kept until overwritten — store-side `expire_at` expiry is a property
/// of the production backend, not of this test double.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegionStore {
    regions: Arc<RwLock<HashMap<String, RegionRecord>>>,
}

impl MemoryRegionStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a region document, simulating store-side expiry in tests.
    pub fn remove_region(&self, name: &str) {
        self.regions.write().remove(name);
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    #[tracing::instrument(skip(self, record), fields(region = %record.name))]
    async fn upsert_region(&self, record: &RegionRecord) -> StorageResult<UpsertOutcome> {
        let mut regions = self.regions.write();
        let outcome = if regions.contains_key(&record.name) {
            UpsertOutcome::updated()
        } else {
            UpsertOutcome::created()
        };
        regions.insert(record.name.clone(), record.clone());
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    async fn get_region(&self, name: &str) -> StorageResult<Option<RegionRecord>> {
        Ok(self.regions.read().get(name).cloned())
    }
}
