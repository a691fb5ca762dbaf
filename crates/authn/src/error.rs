//! Authentication error types.
//!
//! This module defines errors that can occur while verifying a router's
//! bearer token against the region registry.

use relaymesh_storage::StorageError;
use thiserror::Error;

use crate::RegistryError;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Token decoded but violates the region-binding contract (missing kid,
    /// missing region claim, or kid not equal to the region claim).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The region named by the token is not known to the registry.
    #[error("Unknown region: {region}")]
    UnknownRegion {
        /// The region name the token claimed.
        region: String,
    },

    /// Algorithm is not the single accepted one.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Malformed JWT - cannot be decoded at all.
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Storage backend error during secret resolution.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Secret storage error: {0}")]
    Storage(
        /// The underlying storage error that caused the lookup to fail.
        #[source]
        StorageError,
    ),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                AuthError::InvalidTokenFormat("Invalid JWT structure".into())
            },
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            _ => AuthError::InvalidTokenFormat(format!("JWT error: {err}")),
        }
    }
}

impl From<RegistryError> for AuthError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownRegion { name } => AuthError::UnknownRegion { region: name },
            RegistryError::Storage(storage) => AuthError::Storage(storage),
            other => AuthError::Storage(StorageError::internal(other.to_string())),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
