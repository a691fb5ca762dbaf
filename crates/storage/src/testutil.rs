//! Shared test utilities for store testing.
//!
//! This module provides record factories and assertion helpers used by the
//! registry crates' integration tests. It is feature-gated behind `testutil`
//! to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! relaymesh-storage = { path = "../storage", features = ["testutil"] }
//! ```

use chrono::{Duration, Utc};

use crate::{
    error::{StorageError, StorageResult},
    lease::{LeaseWrite, MemoryRouterLeaseStore, RouterLeaseStore, TranslationTable},
    region::{MemoryRegionStore, RegionRecord, RegionStore},
    types::GeoPoint,
};

/// Create a region record with test defaults for the given name.
///
/// Secret is `b"secret-{name}"`, one allow-list prefix, one geo point, and
/// `expire_at` 48 hours out.
#[must_use]
pub fn make_region(name: &str) -> RegionRecord {
    RegionRecord::builder()
        .name(name)
        .secret(format!("secret-{name}").into_bytes())
        .ip_filter(vec!["1.2.3.0/24".to_owned()])
        .geo_positions(vec![GeoPoint::new(48.1, 11.5)])
        .expire_at(Utc::now() + Duration::hours(48))
        .build()
}

/// Create a lease write with test defaults for the given url.
#[must_use]
pub fn make_lease_write(url: &str, region: &str) -> LeaseWrite {
    LeaseWrite::builder()
        .url(url)
        .ws_url("wss://node.example/ws")
        .spki("MIIBIjANBg")
        .num_clients(0)
        .max_clients(100)
        .num_realms(0)
        .max_realms(10)
        .region(region)
        .expire_at(Utc::now() + Duration::seconds(30))
        .build()
}

/// Create a [`MemoryRegionStore`] pre-populated with the given region names.
///
/// # Panics
///
/// Panics if an upsert fails (should not happen with `MemoryRegionStore`).
pub async fn seeded_region_store(names: &[&str]) -> MemoryRegionStore {
    let store = MemoryRegionStore::new();
    for name in names {
        store.upsert_region(&make_region(name)).await.expect("populate upsert failed");
    }
    store
}

/// Create a [`MemoryRouterLeaseStore`] with a translation table published
/// for the router at `url`.
///
/// # Panics
///
/// Panics if the table write fails (should not happen with
/// `MemoryRouterLeaseStore`).
pub async fn store_with_table(url: &str, mappings: &[(&str, &str)]) -> MemoryRouterLeaseStore {
    let store = MemoryRouterLeaseStore::new();
    let mut table = TranslationTable::default();
    for (token, internal) in mappings {
        table.trans_hash.insert((*token).to_owned(), (*internal).to_owned());
    }
    store.set_translation_table(url, table).await.expect("populate table failed");
    store
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "{}: expected StorageError::NotFound, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Helper to verify that a result is a `NotFound` error.
pub fn is_not_found<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::NotFound { .. }))
}

/// Helper to verify that a result is a `Timeout` error.
pub fn is_timeout<T>(result: &StorageResult<T>) -> bool {
    matches!(result, Err(StorageError::Timeout))
}
