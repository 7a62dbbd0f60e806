//! Database operations for products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use maple_spruce_core::{ArtistId, CategoryId, ProductId, ProductStatus};

use super::{RepositoryError, unique_violation};
use crate::models::{
    CreateProductInput, MAX_QUANTITY, Product, ProductFilter, SquareSnapshot, UpdateProductInput,
};

const COLUMNS: &str = "id, name, description, sku, price, quantity, status, artist_id, \
                       category_id, square_item_id, square_variation_id, square_snapshot, \
                       created_at, updated_at";
const SKU_INDEX: &str = "idx_products_sku";
const DUPLICATE_SKU: &str = "a product with this SKU already exists";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: Option<String>,
    sku: Option<String>,
    price: Decimal,
    quantity: i32,
    status: ProductStatus,
    artist_id: Option<i32>,
    category_id: Option<i32>,
    square_item_id: Option<String>,
    square_variation_id: Option<String>,
    square_snapshot: Option<Json<SquareSnapshot>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            sku: row.sku,
            price: row.price,
            quantity: row.quantity,
            status: row.status,
            artist_id: row.artist_id.map(ArtistId::new),
            category_id: row.category_id.map(CategoryId::new),
            square_item_id: row.square_item_id,
            square_variation_id: row.square_variation_id,
            square_snapshot: row.square_snapshot.map(|Json(s)| s),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Result of a relative stock change.
#[derive(Debug)]
pub enum QuantityAdjustment {
    Applied(Product),
    /// The change would have taken stock below zero or above
    /// [`MAX_QUANTITY`]; nothing was written.
    OutOfRange { available: i32 },
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is already used.
    pub async fn create(&self, input: &CreateProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products \
                (name, description, sku, price, quantity, status, artist_id, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.sku)
        .bind(input.price)
        .bind(input.quantity)
        .bind(input.status)
        .bind(input.artist_id.map(|id| id.as_i32()))
        .bind(input.category_id.map(|id| id.as_i32()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| unique_violation(e, SKU_INDEX, DUPLICATE_SKU))?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Find the product linked to a Square item variation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_square_variation(
        &self,
        variation_id: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products WHERE square_variation_id = $1"
        ))
        .bind(variation_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products \
             WHERE ($1::product_status IS NULL OR status = $1) \
               AND ($2::int IS NULL OR artist_id = $2) \
               AND ($3::int IS NULL OR category_id = $3) \
               AND ($4::int IS NULL OR quantity <= $4) \
             ORDER BY name, id"
        ))
        .bind(filter.status)
        .bind(filter.artist_id.map(|id| id.as_i32()))
        .bind(filter.category_id.map(|id| id.as_i32()))
        .bind(filter.low_stock)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Products linked to Square that are still sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_linked(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {COLUMNS} FROM products \
             WHERE square_variation_id IS NOT NULL AND status <> 'discontinued' \
             ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Merge a partial update into the stored product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or
    /// `RepositoryError::Conflict` if the new SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &UpdateProductInput,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                description = CASE WHEN $3 THEN $4 ELSE description END, \
                sku = CASE WHEN $5 THEN $6 ELSE sku END, \
                price = COALESCE($7, price), \
                quantity = COALESCE($8, quantity), \
                status = COALESCE($9, status), \
                artist_id = CASE WHEN $10 THEN $11 ELSE artist_id END, \
                category_id = CASE WHEN $12 THEN $13 ELSE category_id END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(input.description.is_some())
        .bind(input.description.as_ref().and_then(Option::as_ref))
        .bind(input.sku.is_some())
        .bind(input.sku.as_ref().and_then(Option::as_ref))
        .bind(input.price)
        .bind(input.quantity)
        .bind(input.status)
        .bind(input.artist_id.is_some())
        .bind(input.artist_id.flatten().map(|id| id.as_i32()))
        .bind(input.category_id.is_some())
        .bind(input.category_id.flatten().map(|id| id.as_i32()))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| unique_violation(e, SKU_INDEX, DUPLICATE_SKU))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Add `delta` to the stock level in a single statement, keeping the
    /// result within `0..=MAX_QUANTITY`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn adjust_quantity(
        &self,
        id: ProductId,
        delta: i32,
    ) -> Result<QuantityAdjustment, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET quantity = quantity + $2 \
             WHERE id = $1 AND quantity::bigint + $2 BETWEEN 0 AND $3 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(delta)
        .bind(MAX_QUANTITY)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(QuantityAdjustment::Applied(row.into()));
        }

        let available: Option<i32> = sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        available
            .map(|available| QuantityAdjustment::OutOfRange { available })
            .ok_or(RepositoryError::NotFound)
    }

    /// Store the Square catalog IDs and the snapshot taken after pushing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn link_square(
        &self,
        id: ProductId,
        item_id: &str,
        variation_id: &str,
        snapshot: &SquareSnapshot,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                square_item_id = $2, square_variation_id = $3, square_snapshot = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(item_id)
        .bind(variation_id)
        .bind(Json(snapshot))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Forget the Square link, e.g. after the catalog object disappeared.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn unlink_square(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                square_item_id = NULL, square_variation_id = NULL, square_snapshot = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Replace the cached Square snapshot. `None` records that the catalog
    /// object could not be found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_snapshot(
        &self,
        id: ProductId,
        snapshot: Option<&SquareSnapshot>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE products SET square_snapshot = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(snapshot.map(Json))
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
