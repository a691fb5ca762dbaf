//! JWT algorithm and key-id validation.
//!
//! Router tokens use exactly one algorithm. There is no negotiation and no
//! allow-list to configure: the header either says [`REQUIRED_ALGORITHM`] or
//! the token is rejected before any key material is touched. This closes the
//! usual substitution attacks (`none`, downgrades to weaker HMAC variants,
//! cross-family confusion) in one check.

use crate::error::AuthError;

/// The single accepted JWT algorithm for router tokens.
pub const REQUIRED_ALGORITHM: &str = "HS512";

/// Validate the JWT header algorithm.
///
/// - ALWAYS rejects "none"
/// - Rejects everything that is not exactly [`REQUIRED_ALGORITHM`]
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for any algorithm other than
/// HS512.
///
/// # Examples
///
/// ```
/// use relaymesh_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("HS512").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if alg.eq_ignore_ascii_case("none") {
        return Err(AuthError::UnsupportedAlgorithm(
            "Algorithm 'none' is not allowed for security reasons".into(),
        ));
    }

    if alg != REQUIRED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{alg}' is not accepted (only {REQUIRED_ALGORITHM} is supported)"
        )));
    }

    Ok(())
}

/// Validate a key id taken from an untrusted request path.
///
/// Key ids double as region names, which are plain alphanumeric tokens. The
/// key-lookup route exposes the id to collaborator deployments, so anything
/// outside that charset is rejected before it reaches a store query.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the id is empty or contains a
/// non-alphanumeric character.
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    if kid.is_empty() {
        return Err(AuthError::MalformedToken("empty key id".into()));
    }
    if !kid.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthError::MalformedToken(format!(
            "key id {kid:?} contains non-alphanumeric characters"
        )));
    }
    Ok(())
}
