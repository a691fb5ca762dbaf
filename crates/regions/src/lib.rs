//! Region registry for the relaymesh control plane.
//!
//! Regions are the administrative partitions media-routing nodes authenticate
//! under. This crate parses the operator-supplied region seed list, keeps the
//! region documents re-asserted in the store, and serves signing secrets from
//! an in-memory snapshot with bounded staleness.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use relaymesh_regions::{RegionRegistry, parse_seed_list};
//! use relaymesh_storage::MemoryRegionStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let seeds = parse_seed_list("eu|c2VjcmV0|1.2.3.0/24|48.1,11.5")?;
//!
//!     let registry = Arc::new(RegionRegistry::new(Arc::new(MemoryRegionStore::new())));
//!     registry.refresh_all(&seeds).await;
//!
//!     let secret = registry.resolve_secret("eu").await?;
//!     assert_eq!(&**secret, b"secret");
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod seed;

pub use error::{RegistryError, RegistryResult};
pub use registry::{
    DEFAULT_RECORD_TTL, DEFAULT_STALENESS_WINDOW, RegionRegistry, SeedRefreshHandle,
};
pub use seed::{RegionSeed, parse_seed_list};
