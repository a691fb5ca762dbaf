//! Announce pipeline error types.

use relaymesh_storage::StorageError;
use thiserror::Error;

/// Result type alias for announce operations.
pub type AnnounceResult<T> = Result<T, AnnounceError>;

/// Errors produced while handling a router announcement.
///
/// Only two things can go wrong from the caller's point of view: the
/// announcement itself is structurally bad (the caller's fault, reject and
/// name the field), or the store let us down (nobody's fault, retryable).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnnounceError {
    /// A field of the announcement failed structural validation.
    #[error("Malformed announcement field {field:?}: {reason}")]
    MalformedRequest {
        /// The announcement field that failed validation.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The backing store failed mid-announce.
    #[error("Storage error")]
    Storage(#[from] StorageError),
}

impl AnnounceError {
    /// Creates a new `MalformedRequest` error for the given field.
    #[must_use]
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRequest { field, reason: reason.into() }
    }
}
