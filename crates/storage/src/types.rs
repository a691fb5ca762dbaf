//! Common types shared across store operations.

use serde::{Deserialize, Serialize};

/// Counts reported by a document upsert.
///
/// Mirrors the matched/modified/created triple a document store returns from
/// an update-with-upsert, which the lease registry inspects to detect both
/// no-effect writes and concurrent-insert races (two announcements creating
/// a document for the same key in the same logical operation).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Number of existing documents matched by the key.
    pub matched: u64,
    /// Number of documents actually modified.
    pub modified: u64,
    /// Number of documents newly created by the upsert.
    pub created: u64,
}

impl UpsertOutcome {
    /// Outcome for an in-place update of one existing document.
    #[must_use]
    pub fn updated() -> Self {
        Self { matched: 1, modified: 1, created: 0 }
    }

    /// Outcome for a fresh insert of one document.
    #[must_use]
    pub fn created() -> Self {
        Self { matched: 0, modified: 0, created: 1 }
    }

    /// Whether the upsert changed anything at all.
    ///
    /// A `false` here after an upsert that was expected to write is a
    /// store-error condition for the caller.
    #[must_use]
    pub fn had_effect(&self) -> bool {
        self.modified + self.created > 0
    }
}

/// A geographic point in a region's service area.
///
/// Stored as plain latitude/longitude degrees; the registry never computes
/// with these, it only persists and serves them.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}
