//! Sync conflict models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maple_spruce_core::{
    ConflictResolution, ConflictType, ExternalSystem, ProductId, SyncConflictId,
    SyncConflictStatus,
};

use super::{MAX_TEXT_LENGTH, ValidationError, optional_text};

/// Notes recorded when a re-check finds the discrepancy gone.
pub const AUTO_RESOLVED_NOTES: &str = "auto-resolved: values match";

/// A recorded discrepancy between a product and an external system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    pub id: SyncConflictId,
    pub product_id: ProductId,
    pub external_system: ExternalSystem,
    pub conflict_type: ConflictType,
    /// Our value at detection time.
    pub local_value: serde_json::Value,
    /// The external system's value at detection time (`null` when missing).
    pub external_value: serde_json::Value,
    pub status: SyncConflictStatus,
    pub resolution: Option<ConflictResolution>,
    pub resolution_notes: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A discrepancy found by comparing a product with its external snapshot,
/// before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedConflict {
    pub conflict_type: ConflictType,
    pub local_value: serde_json::Value,
    pub external_value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveConflictInput {
    pub resolution: ConflictResolution,
    pub notes: Option<String>,
}

impl ResolveConflictInput {
    /// # Errors
    ///
    /// Returns an error if the notes are too long.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            resolution: self.resolution,
            notes: optional_text("notes", self.notes, MAX_TEXT_LENGTH)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConflictFilter {
    pub status: Option<SyncConflictStatus>,
    pub product_id: Option<ProductId>,
}

/// Outcome of a sync check over one or more products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub checked: usize,
    /// Conflicts newly recorded or refreshed.
    pub conflicts_recorded: usize,
    pub auto_resolved: usize,
    pub failures: usize,
}

impl SyncSummary {
    /// Fold another summary into this one.
    pub const fn merge(&mut self, other: &Self) {
        self.checked += other.checked;
        self.conflicts_recorded += other.conflicts_recorded;
        self.auto_resolved += other.auto_resolved;
        self.failures += other.failures;
    }
}
