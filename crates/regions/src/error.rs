//! Registry error types.

use relaymesh_storage::StorageError;
use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced by the region registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The named region is not in the cache and could not be fetched.
    #[error("Unknown region: {name}")]
    UnknownRegion {
        /// The region name that could not be resolved.
        name: String,
    },

    /// A seed entry could not be parsed.
    #[error("Invalid region seed {entry:?}: {reason}")]
    InvalidSeed {
        /// The seed entry as supplied, name part only if available.
        entry: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// The backing store failed.
    #[error("Storage error")]
    Storage(#[from] StorageError),
}

impl RegistryError {
    /// Creates a new `UnknownRegion` error for the given name.
    #[must_use]
    pub fn unknown_region(name: impl Into<String>) -> Self {
        Self::UnknownRegion { name: name.into() }
    }

    /// Creates a new `InvalidSeed` error.
    #[must_use]
    pub fn invalid_seed(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSeed { entry: entry.into(), reason: reason.into() }
    }
}
