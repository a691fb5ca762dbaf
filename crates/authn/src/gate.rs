//! The region-scoped authentication gate.
//!
//! Verification runs in two phases. First the token is peeked without any
//! cryptography: the header must carry the single accepted algorithm and a
//! key id, and the claims must name a region literally equal to that key id.
//! Only then is the region's secret resolved and the signature checked. The
//! binding check comes first so a token signed with region A's perfectly
//! valid secret can never authenticate as region B.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use relaymesh_regions::RegionRegistry;
use relaymesh_storage::Zeroizing;
use serde::Deserialize;

use crate::{
    claims::RouterClaims,
    error::{AuthError, Result},
    validation::validate_algorithm,
};

/// Token header fields the gate inspects before verification.
///
/// Parsed from the raw segment rather than through the JWT library so that
/// an unknown `alg` string ("none" included) produces the algorithm
/// rejection instead of a generic parse error.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Verifies router bearer tokens against the region registry.
pub struct AuthGate {
    registry: Arc<RegionRegistry>,
}

impl AuthGate {
    /// Creates a gate over the given registry.
    #[must_use]
    pub fn new(registry: Arc<RegionRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves the verification secret for a token's key id.
    ///
    /// Enforces the region-binding contract before touching the registry:
    /// the claims must name a region and it must literally equal the key id.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the region claim is absent or does
    ///   not match the key id
    /// - [`AuthError::UnknownRegion`] if the registry cannot resolve it
    pub async fn resolve_secret(
        &self,
        kid: &str,
        claimed_region: Option<&str>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let region = claimed_region
            .ok_or_else(|| AuthError::MalformedToken("missing region claim".into()))?;
        if kid != region {
            tracing::warn!(kid, region, "token key id does not match region claim");
            return Err(AuthError::MalformedToken(
                "key id does not match region claim".into(),
            ));
        }
        Ok(self.registry.resolve_secret(kid).await?)
    }

    /// Verifies a bearer token and returns its claims.
    ///
    /// May trigger one synchronous store fetch through the registry when the
    /// cached region entry is missing or stale; an unknown region is never
    /// remembered, so a region created moments later verifies immediately.
    ///
    /// # Errors
    ///
    /// See [`AuthError`]; the variants map one-to-one onto the rejection
    /// reasons (format, algorithm, binding, unknown region, expiry,
    /// signature).
    #[tracing::instrument(skip(self, token))]
    pub async fn verify_token(&self, token: &str) -> Result<RouterClaims> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, _signature] = parts.as_slice() else {
            return Err(AuthError::InvalidTokenFormat(
                "expected three dot-separated segments".into(),
            ));
        };

        let header: RawHeader = decode_segment(header_b64, "header")?;
        validate_algorithm(&header.alg)?;
        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::MalformedToken("missing key id header".into()))?;

        // Unverified peek at the claims; nothing from here is trusted until
        // the signature check below passes.
        let unverified: RouterClaims = decode_segment(claims_b64, "claims")?;
        let secret = self.resolve_secret(&kid, unverified.region.as_deref()).await?;

        let validation = Validation::new(Algorithm::HS512);
        let verified = jsonwebtoken::decode::<RouterClaims>(
            token,
            &DecodingKey::from_secret(&secret),
            &validation,
        )?;

        Ok(verified.claims)
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidTokenFormat(format!("{what} is not valid base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::InvalidTokenFormat(format!("{what} is not valid JSON")))
}
