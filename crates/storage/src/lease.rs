//! Router lease documents, translation tables, and their persistence trait.
//!
//! A router lease is the short-lived record a media-routing node refreshes by
//! announcing itself. Leases are keyed by the node's public `url`; an
//! announcement that stops arriving lets the persisted `expire_at` (now + 30s
//! by default) age the document out store-side.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StorageError, StorageResult},
    types::UpsertOutcome,
};

/// A router lease document as persisted in the lease collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct RouterLease {
    /// Public HTTPS endpoint of the node, also the document key.
    #[builder(into)]
    pub url: String,

    /// Public WebSocket endpoint of the node.
    #[builder(into)]
    pub ws_url: String,

    /// The node's public key in SPKI form.
    #[builder(into)]
    pub spki: String,

    /// Current connected client count.
    pub num_clients: u64,

    /// Advertised client capacity.
    pub max_clients: u64,

    /// Current hosted realm count.
    pub num_realms: u64,

    /// Advertised realm capacity.
    pub max_realms: u64,

    /// Translated client identifiers; `None` when the announcement carried
    /// none or translation dropped them.
    pub clients: Option<Vec<String>>,

    /// Translated primary-realm identifiers; same semantics as `clients`.
    pub primary_realms: Option<Vec<String>>,

    /// Collision marker set when two announcements created the same lease
    /// concurrently. Absent on a cleanly created lease.
    pub hash_salt: Option<String>,

    /// Region the announcing node authenticated under. Always stamped by the
    /// server from the verified token, never taken from the announcement.
    #[builder(into)]
    pub region: String,

    /// Instant after which the lease is eligible for store-side expiry.
    pub expire_at: DateTime<Utc>,
}

/// The partial-update form handed to [`RouterLeaseStore::upsert_lease`].
///
/// Mirrors a document-store `$set` update: every field present here is
/// written, while `clients` / `primary_realms` left as `None` (translation
/// dropped them) are omitted from the write and keep whatever value the
/// stored lease already has. `hash_salt` is never written through this form;
/// it is only set by [`RouterLeaseStore::set_hash_salt`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct LeaseWrite {
    /// Document key, see [`RouterLease::url`].
    #[builder(into)]
    pub url: String,
    /// See [`RouterLease::ws_url`].
    #[builder(into)]
    pub ws_url: String,
    /// See [`RouterLease::spki`].
    #[builder(into)]
    pub spki: String,
    /// See [`RouterLease::num_clients`].
    pub num_clients: u64,
    /// See [`RouterLease::max_clients`].
    pub max_clients: u64,
    /// See [`RouterLease::num_realms`].
    pub num_realms: u64,
    /// See [`RouterLease::max_realms`].
    pub max_realms: u64,
    /// Written only when `Some`; `None` leaves the stored value alone.
    pub clients: Option<Vec<String>>,
    /// Written only when `Some`; `None` leaves the stored value alone.
    pub primary_realms: Option<Vec<String>>,
    /// See [`RouterLease::region`].
    #[builder(into)]
    pub region: String,
    /// See [`RouterLease::expire_at`].
    pub expire_at: DateTime<Utc>,
}

/// Per-router mapping from opaque hash tokens to stable internal
/// identifiers, published by an external process and keyed by the router's
/// `url`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTable {
    /// Hash token → internal identifier mapping applied to compound
    /// identifiers.
    pub trans_hash: HashMap<String, String>,
}

impl TranslationTable {
    /// Looks up the hash for one identifier component.
    #[must_use]
    pub fn get(&self, component: &str) -> Option<&str> {
        self.trans_hash.get(component).map(String::as_str)
    }
}

/// Persistence operations for router leases and translation tables.
#[async_trait]
pub trait RouterLeaseStore: Send + Sync {
    /// Upserts a lease document by `url`, applying the partial-set semantics
    /// described on [`LeaseWrite`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write times out.
    async fn upsert_lease(&self, write: &LeaseWrite) -> StorageResult<UpsertOutcome>;

    /// Reads a single lease document by `url`.
    async fn get_lease(&self, url: &str) -> StorageResult<Option<RouterLease>>;

    /// Reads the translation table for a router, if one has been published.
    async fn get_translation_table(&self, url: &str) -> StorageResult<Option<TranslationTable>>;

    /// Replaces the translation table for a router.
    async fn set_translation_table(&self, url: &str, table: TranslationTable)
    -> StorageResult<()>;

    /// Stamps a collision salt onto an existing lease.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no lease exists for `url`.
    async fn set_hash_salt(&self, url: &str, salt: &str) -> StorageResult<UpsertOutcome>;
}

/// In-memory implementation of [`RouterLeaseStore`] for testing.
///
/// Thread-safe via [`parking_lot::RwLock`]; cloning shares state. As with
/// [`crate::MemoryRegionStore`], `expire_at`-based expiry is left to the
/// production backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryRouterLeaseStore {
    leases: Arc<RwLock<HashMap<String, RouterLease>>>,
    tables: Arc<RwLock<HashMap<String, TranslationTable>>>,
}

impl MemoryRouterLeaseStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_write(existing: Option<&RouterLease>, write: &LeaseWrite) -> RouterLease {
    RouterLease {
        url: write.url.clone(),
        ws_url: write.ws_url.clone(),
        spki: write.spki.clone(),
        num_clients: write.num_clients,
        max_clients: write.max_clients,
        num_realms: write.num_realms,
        max_realms: write.max_realms,
        clients: write
            .clients
            .clone()
            .or_else(|| existing.and_then(|lease| lease.clients.clone())),
        primary_realms: write
            .primary_realms
            .clone()
            .or_else(|| existing.and_then(|lease| lease.primary_realms.clone())),
        hash_salt: existing.and_then(|lease| lease.hash_salt.clone()),
        region: write.region.clone(),
        expire_at: write.expire_at,
    }
}

#[async_trait]
impl RouterLeaseStore for MemoryRouterLeaseStore {
    #[tracing::instrument(skip(self, write), fields(url = %write.url, region = %write.region))]
    async fn upsert_lease(&self, write: &LeaseWrite) -> StorageResult<UpsertOutcome> {
        let mut leases = self.leases.write();
        let existing = leases.get(&write.url);
        // expire_at advances on every announce, so a matched lease is
        // always a modified lease.
        let outcome = if existing.is_some() {
            UpsertOutcome::updated()
        } else {
            UpsertOutcome::created()
        };
        let merged = apply_write(existing, write);
        leases.insert(write.url.clone(), merged);
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    async fn get_lease(&self, url: &str) -> StorageResult<Option<RouterLease>> {
        Ok(self.leases.read().get(url).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn get_translation_table(&self, url: &str) -> StorageResult<Option<TranslationTable>> {
        Ok(self.tables.read().get(url).cloned())
    }

    #[tracing::instrument(skip(self, table))]
    async fn set_translation_table(
        &self,
        url: &str,
        table: TranslationTable,
    ) -> StorageResult<()> {
        self.tables.write().insert(url.to_owned(), table);
        Ok(())
    }

    #[tracing::instrument(skip(self, salt))]
    async fn set_hash_salt(&self, url: &str, salt: &str) -> StorageResult<UpsertOutcome> {
        let mut leases = self.leases.write();
        match leases.get_mut(url) {
            Some(lease) => {
                lease.hash_salt = Some(salt.to_owned());
                Ok(UpsertOutcome::updated())
            }
            None => Err(StorageError::not_found(format!("lease/{url}"))),
        }
    }
}
