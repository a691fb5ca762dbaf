//! Shared test utilities for token verification testing.
//!
//! Provides a well-formed HS512 token builder plus a raw token crafter for
//! attack-shaped inputs (wrong algorithm, missing claims, forged bindings).
//! Feature-gated behind `testutil` to keep it out of production builds.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, crypto};

use crate::claims::RouterClaims;

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Builds a correctly bound HS512 token: `kid` and region claim both set to
/// `region`, valid for five minutes.
///
/// # Panics
///
/// Panics if signing fails, which cannot happen for HMAC keys.
#[must_use]
pub fn signed_token(secret: &[u8], region: &str) -> String {
    let now = unix_now();
    let claims = RouterClaims { region: Some(region.to_owned()), exp: now + 300, iat: now };
    let header = Header { kid: Some(region.to_owned()), ..Header::new(Algorithm::HS512) };
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(secret))
        .expect("HS512 signing cannot fail")
}

/// Crafts tokens segment by segment, including ones no sane library would
/// emit.
///
/// Defaults produce the same token as [`signed_token`] would; each method
/// breaks one property.
#[derive(Clone, Debug)]
pub struct TokenCrafter {
    alg: String,
    kid: Option<String>,
    region: Option<String>,
    exp: u64,
    iat: u64,
}

impl TokenCrafter {
    /// Starts from a correctly bound, unexpired token for `region`.
    #[must_use]
    pub fn new(region: &str) -> Self {
        let now = unix_now();
        Self {
            alg: "HS512".to_owned(),
            kid: Some(region.to_owned()),
            region: Some(region.to_owned()),
            exp: now + 300,
            iat: now,
        }
    }

    /// Sets the header `alg` string verbatim ("none" included).
    #[must_use]
    pub fn alg(mut self, alg: &str) -> Self {
        self.alg = alg.to_owned();
        self
    }

    /// Overrides or removes the header key id.
    #[must_use]
    pub fn kid(mut self, kid: Option<&str>) -> Self {
        self.kid = kid.map(str::to_owned);
        self
    }

    /// Overrides or removes the region claim.
    #[must_use]
    pub fn region(mut self, region: Option<&str>) -> Self {
        self.region = region.map(str::to_owned);
        self
    }

    /// Moves the token well past expiry (beyond any verification leeway).
    #[must_use]
    pub fn expired(mut self) -> Self {
        let now = unix_now();
        self.exp = now.saturating_sub(600);
        self.iat = now.saturating_sub(900);
        self
    }

    /// Assembles and signs the token with `secret`.
    ///
    /// The signature algorithm follows the header `alg` where the HMAC
    /// family allows it; an unknown or "none" header gets an HS512 signature
    /// (or none at all), since such tokens must be rejected on the header
    /// before the signature is ever examined.
    ///
    /// # Panics
    ///
    /// Panics if HMAC signing fails, which cannot happen.
    #[must_use]
    pub fn build(&self, secret: &[u8]) -> String {
        let mut header = serde_json::json!({ "typ": "JWT", "alg": self.alg });
        if let Some(kid) = &self.kid {
            header["kid"] = serde_json::json!(kid);
        }
        let mut claims = serde_json::json!({ "exp": self.exp, "iat": self.iat });
        if let Some(region) = &self.region {
            claims["region"] = serde_json::json!(region);
        }

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
        );

        if self.alg == "none" {
            return format!("{signing_input}.");
        }

        let algorithm = match self.alg.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            _ => Algorithm::HS512,
        };
        let signature =
            crypto::sign(signing_input.as_bytes(), &EncodingKey::from_secret(secret), algorithm)
                .expect("HMAC signing cannot fail");
        format!("{signing_input}.{signature}")
    }
}

/// Assert that a verification result failed with the given [`AuthError`]
/// pattern.
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use relaymesh_authn::{AuthError, assert_auth_error};
///
/// let result: Result<(), AuthError> = Err(AuthError::TokenExpired);
/// assert_auth_error!(result, AuthError::TokenExpired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $pattern:pat $(,)?) => {
        match $result {
            Err($pattern) => {},
            other => panic!("expected {}, got: {:?}", stringify!($pattern), other),
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_crafter_defaults_match_signed_token_shape() {
        let crafted = TokenCrafter::new("eu").build(b"secret");
        let built = signed_token(b"secret", "eu");
        // Same segment count and identical header intent.
        assert_eq!(crafted.split('.').count(), 3);
        assert_eq!(built.split('.').count(), 3);
    }

    #[test]
    fn test_none_token_has_empty_signature() {
        let token = TokenCrafter::new("eu").alg("none").build(b"secret");
        assert!(token.ends_with('.'));
    }

    #[test]
    fn test_assert_auth_error_macro() {
        let result: Result<(), AuthError> = Err(AuthError::TokenExpired);
        assert_auth_error!(result, AuthError::TokenExpired);
    }
}
