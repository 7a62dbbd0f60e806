//! Product catalog writes that are mirrored to Square.
//!
//! The database is written first. Square is called afterwards and, if it
//! fails, the local change stays in place and the Square error is returned
//! to the caller; the next sync check will surface any drift as a conflict.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::products::QuantityAdjustment;
use crate::db::{ArtistRepository, CategoryRepository, ProductRepository, SyncConflictRepository};
use crate::error::AppError;
use crate::models::{
    AdjustQuantityInput, CreateProductInput, MAX_QUANTITY, Product, SquareSnapshot,
    UpdateProductInput, ValidationError,
};
use crate::square::{CatalogItemSpec, CatalogObject, ExistingItem, SquareClient, SquareError};
use maple_spruce_core::{ArtistId, CategoryId, ProductId};

/// Product operations that keep the Square catalog in step.
pub struct CatalogService {
    pool: PgPool,
    square: SquareClient,
}

impl CatalogService {
    #[must_use]
    pub const fn new(pool: PgPool, square: SquareClient) -> Self {
        Self { pool, square }
    }

    fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.pool)
    }

    /// Create a product and, unless told otherwise, push it to Square.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for bad input or unknown references,
    /// `AppError::Conflict` for a duplicate SKU and `AppError::Square` if the
    /// product was saved but could not be pushed.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: CreateProductInput) -> Result<Product, AppError> {
        let input = input.validate()?;
        self.check_references(input.artist_id, input.category_id)
            .await?;

        let product = self.products().create(&input).await?;
        info!(product_id = %product.id, "Product created");

        if !input.sync_to_square {
            return Ok(product);
        }

        let product = self.push_catalog(&product).await.inspect_err(|e| {
            warn!(product_id = %product.id, error = %e, "Product saved but not pushed to Square");
        })?;
        self.push_quantity(product).await
    }

    /// Get a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, AppError> {
        self.products()
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("product", id))
    }

    /// Merge a partial update and mirror catalog or stock changes to Square.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Square` if the update was saved but Square rejected
    /// the change.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: UpdateProductInput,
    ) -> Result<Product, AppError> {
        let input = input.validate()?;
        self.check_references(input.artist_id.flatten(), input.category_id.flatten())
            .await?;

        let before = self.get_product(id).await?;
        let mut product = self.products().update(id, &input).await?;

        if !product.is_linked_to_square() {
            return Ok(product);
        }

        let catalog_changed = input.touches_catalog()
            && (product.name != before.name
                || product.price != before.price
                || product.sku != before.sku);
        if catalog_changed {
            product = self.push_catalog(&product).await?;
        }
        if product.quantity != before.quantity {
            product = self.push_quantity(product).await?;
        }
        Ok(product)
    }

    /// Apply a relative stock change and push the new count to Square.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the change would take stock below zero
    /// or above [`MAX_QUANTITY`].
    #[instrument(skip(self, input), fields(delta = input.delta))]
    pub async fn adjust_quantity(
        &self,
        id: ProductId,
        input: AdjustQuantityInput,
    ) -> Result<Product, AppError> {
        let input = input.validate()?;

        let product = match self.products().adjust_quantity(id, input.delta).await? {
            QuantityAdjustment::Applied(product) => product,
            QuantityAdjustment::OutOfRange { available } => {
                let message = if input.delta < 0 {
                    format!("only {available} in stock, cannot apply {}", input.delta)
                } else {
                    format!(
                        "{available} in stock, adding {} would exceed {MAX_QUANTITY}",
                        input.delta
                    )
                };
                return Err(AppError::Conflict(message));
            }
        };
        info!(
            product_id = %id,
            quantity = product.quantity,
            reason = input.reason.as_deref().unwrap_or(""),
            "Stock adjusted"
        );

        if product.is_linked_to_square() {
            return self.push_quantity(product).await;
        }
        Ok(product)
    }

    /// Delete the Square catalog item (when linked), then the product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Square` if Square refused the delete; the product
    /// is kept in that case so it can be retried.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AppError> {
        let product = self.get_product(id).await?;

        if let Some(item_id) = &product.square_item_id {
            self.square.delete_object(item_id).await?;
        }

        SyncConflictRepository::new(&self.pool)
            .delete_for_product(id)
            .await?;
        self.products().delete(id).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Upsert the product's catalog item. Creates a new item when the product
    /// is not linked or its item disappeared from Square.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Square` if Square rejects the upsert.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn push_catalog(&self, product: &Product) -> Result<Product, AppError> {
        let existing = match (&product.square_item_id, &product.square_variation_id) {
            (Some(item_id), Some(variation_id)) => self
                .square
                .retrieve_item(item_id)
                .await?
                .and_then(|item| existing_item(&item, variation_id)),
            _ => None,
        };

        let spec = CatalogItemSpec {
            name: product.name.clone(),
            description: product.description.clone(),
            sku: product.sku.clone(),
            price: product.price,
            existing,
        };
        let upserted = self.square.upsert_item(&spec).await?;

        let snapshot = SquareSnapshot {
            name: product.name.clone(),
            price: Some(product.price),
            quantity: product.square_snapshot.as_ref().and_then(|s| s.quantity),
            version: upserted.version,
            fetched_at: Utc::now(),
        };
        let linked = self
            .products()
            .link_square(product.id, &upserted.item_id, &upserted.variation_id, &snapshot)
            .await?;
        info!(
            product_id = %product.id,
            item_id = %upserted.item_id,
            "Catalog item pushed to Square"
        );
        Ok(linked)
    }

    /// Overwrite Square's in-stock count with the local quantity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the product is not linked, or
    /// `AppError::Square` if Square rejects the count.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn push_quantity(&self, mut product: Product) -> Result<Product, AppError> {
        let variation_id = product
            .square_variation_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("product is not linked to Square".into()))?;

        self.square
            .set_physical_count(variation_id, product.quantity)
            .await?;

        if let Some(snapshot) = product.square_snapshot.as_mut() {
            snapshot.quantity = Some(product.quantity);
            snapshot.fetched_at = Utc::now();
            self.products()
                .set_snapshot(product.id, Some(&*snapshot))
                .await?;
        }
        Ok(product)
    }

    /// Read the product's current state from Square. `Ok(None)` if the item
    /// or its variation no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` if Square cannot be read.
    pub async fn fetch_snapshot(
        &self,
        product: &Product,
    ) -> Result<Option<SquareSnapshot>, SquareError> {
        let (Some(item_id), Some(variation_id)) =
            (&product.square_item_id, &product.square_variation_id)
        else {
            return Ok(None);
        };

        let Some(item) = self.square.retrieve_item(item_id).await? else {
            return Ok(None);
        };
        let Some(variation) = item.variation(variation_id) else {
            return Ok(None);
        };

        let quantity = self.square.retrieve_count(variation_id).await?;
        Ok(Some(SquareSnapshot {
            name: item.item_name().unwrap_or_default().to_string(),
            price: variation.price(),
            quantity: Some(quantity),
            version: item.version,
            fetched_at: Utc::now(),
        }))
    }

    async fn check_references(
        &self,
        artist_id: Option<ArtistId>,
        category_id: Option<CategoryId>,
    ) -> Result<(), AppError> {
        if let Some(artist_id) = artist_id
            && !ArtistRepository::new(&self.pool).exists(artist_id).await?
        {
            return Err(ValidationError::new(
                "artist_id",
                format!("artist {artist_id} does not exist"),
            )
            .into());
        }
        if let Some(category_id) = category_id
            && !CategoryRepository::new(&self.pool).exists(category_id).await?
        {
            return Err(ValidationError::new(
                "category_id",
                format!("category {category_id} does not exist"),
            )
            .into());
        }
        Ok(())
    }
}

/// IDs and versions of a retrieved item, if it still has the variation.
fn existing_item(item: &CatalogObject, variation_id: &str) -> Option<ExistingItem> {
    let variation = item.variation(variation_id)?;
    Some(ExistingItem {
        item_id: item.id.clone(),
        variation_id: variation.id.clone(),
        item_version: item.version,
        variation_version: variation.version,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item() -> CatalogObject {
        serde_json::from_str(
            r#"{
                "type": "ITEM",
                "id": "ITEM9",
                "version": 11,
                "item_data": {
                    "name": "Rag Rug",
                    "variations": [
                        {"type": "ITEM_VARIATION", "id": "VAR9", "version": 12,
                         "item_variation_data": {"item_id": "ITEM9"}}
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_existing_item_versions() {
        let existing = existing_item(&item(), "VAR9").unwrap();
        assert_eq!(existing.item_id, "ITEM9");
        assert_eq!(existing.item_version, Some(11));
        assert_eq!(existing.variation_version, Some(12));
    }

    #[test]
    fn test_existing_item_without_variation() {
        assert!(existing_item(&item(), "OTHER").is_none());
    }
}
