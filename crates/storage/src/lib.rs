//! Shared storage abstraction for the relaymesh control plane.
//!
//! This crate provides the [`RegionStore`] and [`RouterLeaseStore`] traits and
//! the record types that the region registry, the authentication gate, and the
//! router lease registry all build on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Registry Layer                            │
//! │   RegionRegistry │ AuthGate │ LeaseRegistry                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                relaymesh-storage                            │
//! │        RegionStore / RouterLeaseStore traits                │
//! │   (upsert_region, get_region, upsert_lease, ...)            │
//! ├───────────────────┬─────────────────────────────────────────┤
//! │ Memory*Store      │        document-store backend           │
//! │   (testing)       │          (production)                   │
//! └───────────────────┴─────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Backends map their internal
//! errors to the [`StorageError`] variants so the registries above can treat
//! "not there" and "store is misbehaving" uniformly.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers
//!   (record factories, assertion macros). Enable this in
//!   `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod error;
pub mod lease;
pub mod region;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use error::{BoxError, StorageError, StorageResult};
pub use lease::{
    LeaseWrite, MemoryRouterLeaseStore, RouterLease, RouterLeaseStore, TranslationTable,
};
pub use region::{MemoryRegionStore, RegionRecord, RegionStore};
pub use types::{GeoPoint, UpsertOutcome};
pub use zeroize::Zeroizing;
