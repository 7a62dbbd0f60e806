//! Sync-conflict detection and resolution against Square.
//!
//! A check compares one product with its Square catalog entry and inventory
//! count in a single pass. Each discrepancy is recorded as a pending
//! conflict (refreshing an existing pending conflict of the same type rather
//! than adding a second one), and pending conflicts whose discrepancy has
//! gone away are closed.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::{ProductRepository, SyncConflictRepository};
use crate::error::AppError;
use crate::models::{
    DetectedConflict, Product, ResolveConflictInput, SquareSnapshot, SyncConflict, SyncSummary,
    UpdateProductInput,
};
use crate::services::catalog::CatalogService;
use crate::square::SquareClient;
use maple_spruce_core::{
    ConflictResolution, ConflictType, ExternalSystem, ProductId, SyncConflictId,
    SyncConflictStatus,
};

/// Compare a product with its Square snapshot.
///
/// `external` is `None` when the linked catalog entry could not be found.
#[must_use]
pub fn detect_conflicts(product: &Product, external: Option<&SquareSnapshot>) -> Vec<DetectedConflict> {
    let Some(external) = external else {
        return vec![DetectedConflict {
            conflict_type: ConflictType::MissingExternal,
            local_value: json!({
                "name": product.name,
                "price": product.price,
                "quantity": product.quantity,
            }),
            external_value: Value::Null,
        }];
    };

    let mut conflicts = Vec::new();

    if product.name.trim() != external.name.trim() {
        conflicts.push(DetectedConflict {
            conflict_type: ConflictType::NameMismatch,
            local_value: json!(product.name),
            external_value: json!(external.name),
        });
    }

    if external.price != Some(product.price) {
        conflicts.push(DetectedConflict {
            conflict_type: ConflictType::PriceMismatch,
            local_value: json!(product.price),
            external_value: json!(external.price),
        });
    }

    let external_quantity = external.quantity.unwrap_or(0);
    if external_quantity != product.quantity {
        conflicts.push(DetectedConflict {
            conflict_type: ConflictType::QuantityMismatch,
            local_value: json!(product.quantity),
            external_value: json!(external_quantity),
        });
    }

    conflicts
}

/// Outcome of checking one product.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProductCheck {
    pub product_id: ProductId,
    /// Pending conflicts after the check.
    pub conflicts: Vec<SyncConflict>,
    pub auto_resolved: u64,
}

/// Runs sync checks and resolves conflicts.
pub struct SyncService {
    pool: PgPool,
    catalog: CatalogService,
    concurrency: usize,
}

impl SyncService {
    #[must_use]
    pub fn new(pool: PgPool, square: SquareClient, concurrency: usize) -> Self {
        Self {
            catalog: CatalogService::new(pool.clone(), square),
            pool,
            concurrency: concurrency.max(1),
        }
    }

    fn conflicts(&self) -> SyncConflictRepository<'_> {
        SyncConflictRepository::new(&self.pool)
    }

    /// Check one product against Square.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the product is not linked to Square,
    /// or `AppError::Square` if Square cannot be read.
    #[instrument(skip(self))]
    pub async fn check_product(&self, product_id: ProductId) -> Result<ProductCheck, AppError> {
        let product = self.catalog.get_product(product_id).await?;
        if !product.is_linked_to_square() {
            return Err(AppError::BadRequest(format!(
                "product {product_id} is not linked to Square"
            )));
        }

        let snapshot = self.catalog.fetch_snapshot(&product).await?;
        ProductRepository::new(&self.pool)
            .set_snapshot(product_id, snapshot.as_ref())
            .await?;

        let detected = detect_conflicts(&product, snapshot.as_ref());
        let mut conflicts = Vec::with_capacity(detected.len());
        for conflict in &detected {
            conflicts.push(
                self.conflicts()
                    .record(product_id, ExternalSystem::Square, conflict)
                    .await?,
            );
        }

        let still_present: Vec<ConflictType> = detected.iter().map(|c| c.conflict_type).collect();
        let auto_resolved = self
            .conflicts()
            .auto_resolve(product_id, ExternalSystem::Square, &still_present)
            .await?;

        if !conflicts.is_empty() || auto_resolved > 0 {
            info!(
                product_id = %product_id,
                conflicts = conflicts.len(),
                auto_resolved,
                "Sync check found changes"
            );
        }

        Ok(ProductCheck {
            product_id,
            conflicts,
            auto_resolved,
        })
    }

    /// Check every linked product that is still sold.
    ///
    /// Failures for individual products are logged and counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the product list cannot be loaded.
    #[instrument(skip(self))]
    pub async fn check_all_products(&self) -> Result<SyncSummary, AppError> {
        let products = ProductRepository::new(&self.pool).list_linked().await?;
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let summary = self.check_many(ids).await;
        info!(
            checked = summary.checked,
            conflicts = summary.conflicts_recorded,
            auto_resolved = summary.auto_resolved,
            failures = summary.failures,
            "Full sync check complete"
        );
        Ok(summary)
    }

    /// Check the products linked to the given Square variations (as named by
    /// an inventory webhook). Unknown variations are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a lookup fails.
    pub async fn check_variations(&self, variation_ids: &[String]) -> Result<SyncSummary, AppError> {
        let products = ProductRepository::new(&self.pool);
        let mut ids = Vec::new();
        for variation_id in variation_ids {
            match products.get_by_square_variation(variation_id).await? {
                Some(product) => ids.push(product.id),
                None => tracing::debug!(%variation_id, "No product for Square variation"),
            }
        }
        Ok(self.check_many(ids).await)
    }

    async fn check_many(&self, ids: Vec<ProductId>) -> SyncSummary {
        stream::iter(ids)
            .map(|id| async move { (id, self.check_product(id).await) })
            .buffer_unordered(self.concurrency)
            .fold(SyncSummary::default(), |mut summary, (id, result)| async move {
                let one = match result {
                    Ok(check) => SyncSummary {
                        checked: 1,
                        conflicts_recorded: check.conflicts.len(),
                        auto_resolved: usize::try_from(check.auto_resolved).unwrap_or(usize::MAX),
                        failures: 0,
                    },
                    Err(e) => {
                        warn!(product_id = %id, error = %e, "Sync check failed");
                        SyncSummary {
                            failures: 1,
                            ..SyncSummary::default()
                        }
                    }
                };
                summary.merge(&one);
                summary
            })
            .await
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the conflict does not exist.
    pub async fn get_conflict(&self, id: SyncConflictId) -> Result<SyncConflict, AppError> {
        self.conflicts()
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("sync conflict", id))
    }

    /// Resolve a pending conflict.
    ///
    /// `use_local` pushes the product's value to Square, `use_external`
    /// writes Square's value onto the product, and `ignore` only closes the
    /// conflict.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the conflict is no longer pending, or
    /// `AppError::Square` if pushing the local value fails (the conflict
    /// then stays pending).
    #[instrument(skip(self, input), fields(resolution = %input.resolution))]
    pub async fn resolve_conflict(
        &self,
        id: SyncConflictId,
        input: ResolveConflictInput,
    ) -> Result<SyncConflict, AppError> {
        let input = input.validate()?;
        let conflict = self.get_conflict(id).await?;
        ensure_pending(&conflict)?;

        match input.resolution {
            ConflictResolution::Ignore => {}
            ConflictResolution::UseLocal => self.apply_local(&conflict).await?,
            ConflictResolution::UseExternal => self.apply_external(&conflict).await?,
        }

        let resolved = self
            .conflicts()
            .resolve(id, input.resolution, input.notes.as_deref())
            .await?
            .ok_or_else(|| AppError::Conflict(format!("sync conflict {id} is no longer pending")))?;

        info!(conflict_id = %id, status = %resolved.status, "Sync conflict resolved");
        Ok(resolved)
    }

    async fn apply_local(&self, conflict: &SyncConflict) -> Result<(), AppError> {
        let product = self.catalog.get_product(conflict.product_id).await?;
        match conflict.conflict_type {
            ConflictType::NameMismatch | ConflictType::PriceMismatch => {
                self.catalog.push_catalog(&product).await?;
            }
            ConflictType::QuantityMismatch => {
                self.catalog.push_quantity(product).await?;
            }
            ConflictType::MissingExternal => {
                // The old IDs point at nothing; push_catalog creates a new item.
                let product = self.catalog.push_catalog(&product).await?;
                self.catalog.push_quantity(product).await?;
            }
        }
        Ok(())
    }

    async fn apply_external(&self, conflict: &SyncConflict) -> Result<(), AppError> {
        let products = ProductRepository::new(&self.pool);
        if conflict.conflict_type == ConflictType::MissingExternal {
            products.unlink_square(conflict.product_id).await?;
            return Ok(());
        }

        let update = external_update(conflict)?;
        let product = products.update(conflict.product_id, &update).await?;

        // Keep the cached snapshot in line with what was just adopted.
        if let Some(mut snapshot) = product.square_snapshot {
            snapshot.fetched_at = Utc::now();
            products.set_snapshot(product.id, Some(&snapshot)).await?;
        }
        Ok(())
    }
}

fn ensure_pending(conflict: &SyncConflict) -> Result<(), AppError> {
    if conflict.status == SyncConflictStatus::Pending {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "sync conflict {} is already {}",
        conflict.id, conflict.status
    )))
}

/// The product update that adopts Square's value for a field conflict.
fn external_update(conflict: &SyncConflict) -> Result<UpdateProductInput, AppError> {
    let bad_value = || {
        AppError::Internal(format!(
            "sync conflict {} has an unusable external value",
            conflict.id
        ))
    };
    let value = conflict.external_value.clone();

    let update = match conflict.conflict_type {
        ConflictType::NameMismatch => UpdateProductInput {
            name: Some(serde_json::from_value::<String>(value).map_err(|_| bad_value())?),
            ..UpdateProductInput::default()
        },
        ConflictType::PriceMismatch => UpdateProductInput {
            price: Some(serde_json::from_value::<Decimal>(value).map_err(|_| bad_value())?),
            ..UpdateProductInput::default()
        },
        ConflictType::QuantityMismatch => UpdateProductInput {
            quantity: Some(serde_json::from_value::<i32>(value).map_err(|_| bad_value())?),
            ..UpdateProductInput::default()
        },
        ConflictType::MissingExternal => return Err(bad_value()),
    };
    Ok(update.validate()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maple_spruce_core::ProductStatus;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(5),
            name: "Tin Lantern".to_string(),
            description: None,
            sku: Some("TL-1".to_string()),
            price: dec("32.00"),
            quantity: 4,
            status: ProductStatus::Active,
            artist_id: None,
            category_id: None,
            square_item_id: Some("ITEM5".to_string()),
            square_variation_id: Some("VAR5".to_string()),
            square_snapshot: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(name: &str, price: &str, quantity: Option<i32>) -> SquareSnapshot {
        SquareSnapshot {
            name: name.to_string(),
            price: Some(dec(price)),
            quantity,
            version: Some(1),
            fetched_at: Utc::now(),
        }
    }

    fn conflict(conflict_type: ConflictType, external_value: Value) -> SyncConflict {
        SyncConflict {
            id: SyncConflictId::new(9),
            product_id: ProductId::new(5),
            external_system: ExternalSystem::Square,
            conflict_type,
            local_value: Value::Null,
            external_value,
            status: SyncConflictStatus::Pending,
            resolution: None,
            resolution_notes: None,
            detected_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_matching_snapshot_has_no_conflicts() {
        let snap = snapshot("Tin Lantern", "32", Some(4));
        assert!(detect_conflicts(&product(), Some(&snap)).is_empty());
    }

    #[test]
    fn test_name_compared_trimmed_and_case_sensitive() {
        let snap = snapshot("  Tin Lantern ", "32.00", Some(4));
        assert!(detect_conflicts(&product(), Some(&snap)).is_empty());

        let snap = snapshot("tin lantern", "32.00", Some(4));
        let conflicts = detect_conflicts(&product(), Some(&snap));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::NameMismatch);
        assert_eq!(conflicts[0].external_value, json!("tin lantern"));
    }

    #[test]
    fn test_price_and_quantity_mismatch() {
        let snap = snapshot("Tin Lantern", "35.00", Some(2));
        let conflicts = detect_conflicts(&product(), Some(&snap));
        let types: Vec<_> = conflicts.iter().map(|c| c.conflict_type).collect();
        assert_eq!(
            types,
            vec![ConflictType::PriceMismatch, ConflictType::QuantityMismatch]
        );
        assert_eq!(conflicts[0].local_value, json!(dec("32.00")));
        assert_eq!(conflicts[1].local_value, json!(4));
        assert_eq!(conflicts[1].external_value, json!(2));
    }

    #[test]
    fn test_uncounted_inventory_is_zero() {
        let mut p = product();
        p.quantity = 0;
        let snap = snapshot("Tin Lantern", "32.00", None);
        assert!(detect_conflicts(&p, Some(&snap)).is_empty());
    }

    #[test]
    fn test_missing_external_is_the_only_conflict() {
        let conflicts = detect_conflicts(&product(), None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::MissingExternal);
        assert_eq!(conflicts[0].external_value, Value::Null);
        assert_eq!(conflicts[0].local_value["quantity"], 4);
    }

    #[test]
    fn test_external_update_for_each_field() {
        let update =
            external_update(&conflict(ConflictType::PriceMismatch, json!("29.50"))).unwrap();
        assert_eq!(update.price, Some(dec("29.50")));
        assert!(update.name.is_none());

        let update = external_update(&conflict(ConflictType::QuantityMismatch, json!(7))).unwrap();
        assert_eq!(update.quantity, Some(7));

        let update =
            external_update(&conflict(ConflictType::NameMismatch, json!("Tin Lamp"))).unwrap();
        assert_eq!(update.name.as_deref(), Some("Tin Lamp"));
    }

    #[test]
    fn test_external_update_rejects_bad_values() {
        assert!(external_update(&conflict(ConflictType::QuantityMismatch, json!("lots"))).is_err());
        assert!(external_update(&conflict(ConflictType::QuantityMismatch, json!(-3))).is_err());
        assert!(external_update(&conflict(ConflictType::MissingExternal, Value::Null)).is_err());
    }

    #[test]
    fn test_only_pending_conflicts_resolve() {
        let mut c = conflict(ConflictType::NameMismatch, json!("x"));
        assert!(ensure_pending(&c).is_ok());
        c.status = SyncConflictStatus::Ignored;
        assert!(matches!(ensure_pending(&c), Err(AppError::Conflict(_))));
    }
}
