//! The router lease registry.
//!
//! `announce` is the whole public surface: validate the body, translate the
//! identifier lists, stamp the caller's region, upsert the lease, and react
//! to the double-insert race with a salt marker. Each step either completes
//! or abandons the announcement; there is no partial write path.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use rand::RngCore;
use relaymesh_storage::{LeaseWrite, RouterLeaseStore, StorageError};

use crate::{
    announce::{RouterAnnouncement, ValidAnnouncement},
    error::{AnnounceError, AnnounceResult},
    translate::translate_list,
};

/// Default lease lifetime. Deliberately short: renewal is the heartbeat.
pub const DEFAULT_LEASE_DURATION: chrono::Duration = chrono::Duration::seconds(30);

/// Width of the race-marker salt, in raw bytes before encoding.
pub const HASH_SALT_LEN: usize = 16;

/// Accepts router announcements and maintains their leases.
pub struct LeaseRegistry {
    store: Arc<dyn RouterLeaseStore>,
    lease_duration: chrono::Duration,
}

impl LeaseRegistry {
    /// Creates a registry with the default lease duration
    /// ([`DEFAULT_LEASE_DURATION`]).
    #[must_use]
    pub fn new(store: Arc<dyn RouterLeaseStore>) -> Self {
        Self { store, lease_duration: DEFAULT_LEASE_DURATION }
    }

    /// Overrides the lease lifetime stamped on every announcement.
    #[must_use]
    pub fn with_lease_duration(mut self, duration: chrono::Duration) -> Self {
        self.lease_duration = duration;
        self
    }

    /// Handles one router announcement.
    ///
    /// `caller_region` must come from the verified token; whatever region
    /// the body claims is ignored.
    ///
    /// # Errors
    ///
    /// - [`AnnounceError::MalformedRequest`] before any store access if the
    ///   body fails structural validation
    /// - [`AnnounceError::Storage`] if the translation lookup, the lease
    ///   upsert, or a required salt write fails, or if either write reports
    ///   no effect at all
    #[tracing::instrument(skip(self, body), fields(region = %caller_region))]
    pub async fn announce(
        &self,
        body: RouterAnnouncement,
        caller_region: &str,
    ) -> AnnounceResult<()> {
        let mut valid = body.validate()?;
        self.apply_translation(&mut valid).await?;

        let write = LeaseWrite::builder()
            .url(valid.url)
            .ws_url(valid.ws_url)
            .spki(valid.spki)
            .num_clients(valid.num_clients)
            .max_clients(valid.max_clients)
            .num_realms(valid.num_realms)
            .max_realms(valid.max_realms)
            .maybe_clients(valid.clients)
            .maybe_primary_realms(valid.primary_realms)
            .region(caller_region)
            .expire_at(Utc::now() + self.lease_duration)
            .build();

        fail::fail_point!("lease-before-upsert", |_| {
            Err(AnnounceError::Storage(StorageError::internal(
                "injected fail-point: lease-before-upsert",
            )))
        });

        let outcome = self.store.upsert_lease(&write).await?;
        if !outcome.had_effect() {
            tracing::error!(url = %write.url, ?outcome, "lease upsert reported no effect");
            return Err(AnnounceError::Storage(StorageError::internal(
                "lease upsert reported no effect",
            )));
        }

        if outcome.created > 1 {
            // Two first-announcements raced on insert; mark the lease so an
            // external reconciler can spot the duplicate rows.
            tracing::warn!(
                url = %write.url,
                created = outcome.created,
                "concurrent lease creation detected, issuing hash salt"
            );
            let salt = generate_salt();
            let salt_outcome = self.store.set_hash_salt(&write.url, &salt).await?;
            if !salt_outcome.had_effect() {
                tracing::error!(url = %write.url, ?salt_outcome, "hash salt write reported no effect");
                return Err(AnnounceError::Storage(StorageError::internal(
                    "hash salt write reported no effect",
                )));
            }
        }

        tracing::debug!(url = %write.url, "lease refreshed");
        Ok(())
    }

    /// Applies the translation step to the validated announcement.
    ///
    /// A missing or empty table drops both lists silently; a store failure
    /// drops them and abandons the announcement.
    async fn apply_translation(&self, valid: &mut ValidAnnouncement) -> AnnounceResult<()> {
        let table = match self.store.get_translation_table(&valid.url).await {
            Ok(table) => table,
            Err(error) => {
                valid.clients = None;
                valid.primary_realms = None;
                tracing::warn!(url = %valid.url, %error, "translation table lookup failed");
                return Err(error.into());
            }
        };

        match table {
            Some(table) if !table.trans_hash.is_empty() => {
                if let Some(clients) = &valid.clients {
                    valid.clients = Some(translate_list(clients, &table));
                }
                if let Some(realms) = &valid.primary_realms {
                    valid.primary_realms = Some(translate_list(realms, &table));
                }
            },
            _ => {
                tracing::debug!(url = %valid.url, "no translation table, dropping identifier lists");
                valid.clients = None;
                valid.primary_realms = None;
            },
        }
        Ok(())
    }
}

impl std::fmt::Debug for LeaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseRegistry")
            .field("lease_duration", &self.lease_duration)
            .finish_non_exhaustive()
    }
}

fn generate_salt() -> String {
    let mut bytes = [0u8; HASH_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
