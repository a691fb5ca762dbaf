//! Region-scoped token verification for media-routing nodes.
//!
//! Routers authenticate with HS512 bearer tokens signed by their region's
//! shared secret. A token names its region twice, once as the header key id
//! and once as a claim, and the two must be literally equal; the secret is
//! then resolved through the cached region registry. One algorithm, one
//! binding rule, no negotiation.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use relaymesh_authn::AuthGate;
//! use relaymesh_regions::{RegionRegistry, parse_seed_list};
//! use relaymesh_storage::MemoryRegionStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(RegionRegistry::new(Arc::new(MemoryRegionStore::new())));
//!     registry.refresh_all(&parse_seed_list("eu|c2VjcmV0")?).await;
//!
//!     let gate = AuthGate::new(registry);
//!     assert!(gate.verify_token("definitely.not.valid").await.is_err());
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with token builders and
//!   assertion macros for downstream tests.

#![deny(unsafe_code)]

pub mod claims;
pub mod error;
pub mod gate;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod validation;

pub use claims::RouterClaims;
pub use error::{AuthError, Result};
pub use gate::AuthGate;
pub use relaymesh_regions::RegistryError;
pub use validation::{REQUIRED_ALGORITHM, validate_algorithm, validate_kid};
