//! Router lease registry for the relaymesh control plane.
//!
//! Media-routing nodes keep themselves registered by announcing their
//! endpoint, capacity, and hosted identities every few seconds. Each
//! announcement refreshes a short-lived lease keyed by the node's URL;
//! nodes that stop announcing simply age out of the store. This crate owns
//! the announce pipeline: structural validation, compound identifier
//! translation, region stamping, and the upsert race marker.
//!
//! # Feature Flags
//!
//! - **`failpoints`**: Enables `fail` crate injection points on the
//!   announce path for fault-injection tests.

#![deny(unsafe_code)]

pub mod announce;
pub mod error;
pub mod registry;
pub mod translate;

pub use announce::{RouterAnnouncement, ValidAnnouncement};
pub use error::{AnnounceError, AnnounceResult};
pub use registry::{DEFAULT_LEASE_DURATION, HASH_SALT_LEN, LeaseRegistry};
pub use translate::{translate_compound, translate_list};
