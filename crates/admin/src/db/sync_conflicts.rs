//! Database operations for sync conflicts.
//!
//! At most one `pending` conflict exists per product, external system and
//! conflict type (enforced by `idx_sync_conflicts_pending`). Recording a
//! conflict that is already pending refreshes its values instead of adding a
//! duplicate.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use maple_spruce_core::{
    ConflictResolution, ConflictType, ExternalSystem, ProductId, SyncConflictId,
    SyncConflictStatus,
};

use super::RepositoryError;
use crate::models::{AUTO_RESOLVED_NOTES, ConflictFilter, DetectedConflict, SyncConflict};

const COLUMNS: &str = "id, product_id, external_system, conflict_type, local_value, \
                       external_value, status, resolution, resolution_notes, detected_at, \
                       resolved_at";

#[derive(Debug, sqlx::FromRow)]
struct SyncConflictRow {
    id: i32,
    product_id: i32,
    external_system: ExternalSystem,
    conflict_type: ConflictType,
    local_value: serde_json::Value,
    external_value: serde_json::Value,
    status: SyncConflictStatus,
    resolution: Option<ConflictResolution>,
    resolution_notes: Option<String>,
    detected_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl From<SyncConflictRow> for SyncConflict {
    fn from(row: SyncConflictRow) -> Self {
        Self {
            id: SyncConflictId::new(row.id),
            product_id: ProductId::new(row.product_id),
            external_system: row.external_system,
            conflict_type: row.conflict_type,
            local_value: row.local_value,
            external_value: row.external_value,
            status: row.status,
            resolution: row.resolution,
            resolution_notes: row.resolution_notes,
            detected_at: row.detected_at,
            resolved_at: row.resolved_at,
        }
    }
}

/// Repository for sync conflict database operations.
pub struct SyncConflictRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SyncConflictRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a detected conflict, or refresh the values of the matching
    /// pending one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record(
        &self,
        product_id: ProductId,
        system: ExternalSystem,
        detected: &DetectedConflict,
    ) -> Result<SyncConflict, RepositoryError> {
        let row = sqlx::query_as::<_, SyncConflictRow>(&format!(
            "INSERT INTO sync_conflicts \
                (product_id, external_system, conflict_type, local_value, external_value) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (product_id, external_system, conflict_type) \
                WHERE status = 'pending' \
             DO UPDATE SET \
                local_value = EXCLUDED.local_value, \
                external_value = EXCLUDED.external_value \
             RETURNING {COLUMNS}"
        ))
        .bind(product_id.as_i32())
        .bind(system)
        .bind(detected.conflict_type)
        .bind(&detected.local_value)
        .bind(&detected.external_value)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SyncConflictId) -> Result<Option<SyncConflict>, RepositoryError> {
        let row = sqlx::query_as::<_, SyncConflictRow>(&format!(
            "SELECT {COLUMNS} FROM sync_conflicts WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List conflicts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ConflictFilter) -> Result<Vec<SyncConflict>, RepositoryError> {
        let rows = sqlx::query_as::<_, SyncConflictRow>(&format!(
            "SELECT {COLUMNS} FROM sync_conflicts \
             WHERE ($1::sync_conflict_status IS NULL OR status = $1) \
               AND ($2::int IS NULL OR product_id = $2) \
             ORDER BY detected_at DESC, id DESC"
        ))
        .bind(filter.status)
        .bind(filter.product_id.map(|id| id.as_i32()))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Move a pending conflict to its final status.
    ///
    /// Returns `None` when the conflict exists but is no longer pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(
        &self,
        id: SyncConflictId,
        resolution: ConflictResolution,
        notes: Option<&str>,
    ) -> Result<Option<SyncConflict>, RepositoryError> {
        let row = sqlx::query_as::<_, SyncConflictRow>(&format!(
            "UPDATE sync_conflicts SET \
                status = $2, resolution = $3, resolution_notes = $4, resolved_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(resolution.target_status())
        .bind(resolution)
        .bind(notes)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Resolve the product's pending conflicts whose type is not in
    /// `still_present`. Returns how many were closed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn auto_resolve(
        &self,
        product_id: ProductId,
        system: ExternalSystem,
        still_present: &[ConflictType],
    ) -> Result<u64, RepositoryError> {
        let still_present: Vec<&str> = still_present.iter().map(ConflictType::as_str).collect();

        let result = sqlx::query(
            "UPDATE sync_conflicts SET \
                status = 'resolved', resolution_notes = $4, resolved_at = NOW() \
             WHERE product_id = $1 AND external_system = $2 AND status = 'pending' \
               AND NOT (conflict_type::text = ANY($3))",
        )
        .bind(product_id.as_i32())
        .bind(system)
        .bind(&still_present)
        .bind(AUTO_RESOLVED_NOTES)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Drop every conflict recorded for a product that is being deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_product(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sync_conflicts WHERE product_id = $1")
            .bind(product_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
