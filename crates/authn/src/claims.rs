//! Router token claims.

use serde::{Deserialize, Serialize};

/// Claims carried by a router's bearer token.
///
/// `region` is the claim the verification pipeline binds to the header key
/// id. It is optional at the serde level so that a token missing it still
/// decodes and produces the precise "missing region" rejection instead of a
/// generic parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterClaims {
    /// Region the bearer claims to operate in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Expiry as a Unix timestamp (seconds).
    pub exp: u64,

    /// Issued-at as a Unix timestamp (seconds).
    pub iat: u64,
}
