//! Router announcement body and structural validation.
//!
//! An announcement is the JSON body a routing node PUTs to refresh its
//! lease. Field presence and numeric types are serde's job at the transport
//! boundary; [`RouterAnnouncement::validate`] covers everything serde
//! cannot express: canonical URLs, non-empty key material, and the
//! identifier charset. Validation is fail-fast and happens before any store
//! access, so a malformed announcement costs nothing but the parse.

use serde::Deserialize;
use url::Url;

use crate::error::{AnnounceError, AnnounceResult};

/// Charset allowed in client and realm identifier entries.
///
/// Identifiers are base64-flavored hashes joined with `:`; anything outside
/// this set is an injection attempt or corruption, never a valid id.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '/' | '=' | ':')
}

/// A router announcement as deserialized from the request body.
///
/// The `region` field is accepted for wire compatibility but never read:
/// the lease's region comes from the verified token, not from the body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouterAnnouncement {
    /// Public HTTPS endpoint; the lease key.
    pub url: String,
    /// Public WebSocket endpoint.
    pub ws_url: String,
    /// The node's public key in SPKI form.
    pub spki: String,
    /// Current connected client count.
    pub num_clients: u64,
    /// Advertised client capacity.
    pub max_clients: u64,
    /// Current hosted realm count.
    pub num_realms: u64,
    /// Advertised realm capacity.
    pub max_realms: u64,
    /// Raw compound client identifiers, pre-translation. Required; a
    /// router with no clients announces an empty list.
    pub clients: Vec<String>,
    /// Raw compound primary-realm identifiers, pre-translation. Required,
    /// like `clients`.
    pub primary_realms: Vec<String>,
    /// Client-supplied region. Ignored; see the type docs.
    #[serde(default)]
    pub region: Option<String>,
}

/// An announcement that passed structural validation.
///
/// `url` and `ws_url` hold the round-trip re-serialized form of the
/// submitted endpoints, so every spelling of the same endpoint maps to the
/// same lease key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidAnnouncement {
    /// Canonical lease key.
    pub url: String,
    /// Canonical WebSocket endpoint.
    pub ws_url: String,
    /// Non-empty SPKI.
    pub spki: String,
    /// Current connected client count.
    pub num_clients: u64,
    /// Advertised client capacity.
    pub max_clients: u64,
    /// Current hosted realm count.
    pub num_realms: u64,
    /// Advertised realm capacity.
    pub max_realms: u64,
    /// Charset-checked raw client identifiers. `Option` from here on:
    /// the translation step sets `None` when the lists are dropped.
    pub clients: Option<Vec<String>>,
    /// Charset-checked raw primary-realm identifiers, same semantics as
    /// `clients`.
    pub primary_realms: Option<Vec<String>>,
}

impl RouterAnnouncement {
    /// Validates the announcement structurally.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::MalformedRequest`] naming the first field
    /// that fails:
    ///
    /// - `url` / `wsUrl` must parse as absolute URLs; the canonical
    ///   round-trip form replaces what the client sent
    /// - `spki` must be non-empty
    /// - every `clients` / `primaryRealms` entry must be non-empty and stay
    ///   within the identifier charset
    pub fn validate(self) -> AnnounceResult<ValidAnnouncement> {
        let url = normalize_url("url", &self.url)?;
        let ws_url = normalize_url("wsUrl", &self.ws_url)?;

        if self.spki.is_empty() {
            return Err(AnnounceError::malformed("spki", "must not be empty"));
        }

        validate_identifier_list("clients", &self.clients)?;
        validate_identifier_list("primaryRealms", &self.primary_realms)?;

        Ok(ValidAnnouncement {
            url,
            ws_url,
            spki: self.spki,
            num_clients: self.num_clients,
            max_clients: self.max_clients,
            num_realms: self.num_realms,
            max_realms: self.max_realms,
            clients: Some(self.clients),
            primary_realms: Some(self.primary_realms),
        })
    }
}

fn normalize_url(field: &'static str, value: &str) -> AnnounceResult<String> {
    let parsed = Url::parse(value)
        .map_err(|e| AnnounceError::malformed(field, format!("not a valid URL: {e}")))?;
    Ok(parsed.into())
}

fn validate_identifier_list(field: &'static str, list: &[String]) -> AnnounceResult<()> {
    for entry in list {
        if entry.is_empty() {
            return Err(AnnounceError::malformed(field, "empty identifier entry"));
        }
        if !entry.chars().all(is_identifier_char) {
            return Err(AnnounceError::malformed(
                field,
                format!("identifier {entry:?} contains characters outside [0-9a-zA-Z_+/=:]"),
            ));
        }
    }
    Ok(())
}
