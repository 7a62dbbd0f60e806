//! Product (inventory) domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maple_spruce_core::{ArtistId, CategoryId, ProductId, ProductStatus};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, map_opt, money, nullable, nullable_text,
    optional_text, required_text,
};

/// Longest SKU we accept.
pub const MAX_SKU_LENGTH: usize = 64;
/// Most units of one product we track.
pub const MAX_QUANTITY: i32 = 1_000_000;

/// A handcrafted item in inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    /// Units on hand. Never negative.
    pub quantity: i32,
    pub status: ProductStatus,
    pub artist_id: Option<ArtistId>,
    pub category_id: Option<CategoryId>,
    /// Square catalog item, if the product is linked.
    pub square_item_id: Option<String>,
    /// Square item variation that carries price and inventory.
    pub square_variation_id: Option<String>,
    /// What Square reported the last time we looked.
    pub square_snapshot: Option<SquareSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product has been pushed to Square.
    #[must_use]
    pub const fn is_linked_to_square(&self) -> bool {
        self.square_variation_id.is_some()
    }
}

/// Cached view of the Square catalog entry for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareSnapshot {
    pub name: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    /// Catalog object version, needed for optimistic-concurrency upserts.
    pub version: Option<i64>,
    pub fetched_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub status: ProductStatus,
    pub artist_id: Option<ArtistId>,
    pub category_id: Option<CategoryId>,
    /// Push the new product to Square after saving it.
    #[serde(default = "default_true")]
    pub sync_to_square: bool,
}

const fn default_true() -> bool {
    true
}

impl CreateProductInput {
    /// Validate and normalize the input.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, MAX_NAME_LENGTH)?,
            description: optional_text("description", self.description, MAX_TEXT_LENGTH)?,
            sku: optional_text("sku", self.sku, MAX_SKU_LENGTH)?,
            price: money("price", self.price)?,
            quantity: quantity(self.quantity)?,
            ..self
        })
    }
}

/// Input for updating a product. Absent fields are left unchanged; nullable
/// fields sent as `null` are cleared.
///
/// Stock changes that should not overwrite a concurrent sale go through
/// [`AdjustQuantityInput`] instead of `quantity` here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub sku: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub status: Option<ProductStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub artist_id: Option<Option<ArtistId>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
}

impl UpdateProductInput {
    /// Validate and normalize the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: map_opt(self.name, |v| required_text("name", &v, MAX_NAME_LENGTH))?,
            description: nullable_text("description", self.description, MAX_TEXT_LENGTH)?,
            sku: nullable_text("sku", self.sku, MAX_SKU_LENGTH)?,
            price: map_opt(self.price, |v| money("price", v))?,
            quantity: map_opt(self.quantity, quantity)?,
            ..self
        })
    }

    /// Whether the change touches a field mirrored in the Square catalog.
    #[must_use]
    pub const fn touches_catalog(&self) -> bool {
        self.name.is_some() || self.price.is_some() || self.sku.is_some()
    }
}

/// Relative stock adjustment (sale, restock, breakage).
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustQuantityInput {
    pub delta: i32,
    pub reason: Option<String>,
}

impl AdjustQuantityInput {
    /// # Errors
    ///
    /// Rejects a zero delta and one larger than [`MAX_QUANTITY`] either way.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.delta == 0 {
            return Err(ValidationError::new("delta", "must not be zero"));
        }
        if self.delta.unsigned_abs() > MAX_QUANTITY.unsigned_abs() {
            return Err(ValidationError::new(
                "delta",
                format!("must be between -{MAX_QUANTITY} and {MAX_QUANTITY}"),
            ));
        }
        Ok(Self {
            delta: self.delta,
            reason: optional_text("reason", self.reason, MAX_NAME_LENGTH)?,
        })
    }
}

/// Filter criteria for listing products.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub artist_id: Option<ArtistId>,
    pub category_id: Option<CategoryId>,
    /// Only products at or below this quantity.
    pub low_stock: Option<i32>,
}

fn quantity(value: i32) -> Result<i32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::new("quantity", "must not be negative"));
    }
    if value > MAX_QUANTITY {
        return Err(ValidationError::new(
            "quantity",
            format!("must be at most {MAX_QUANTITY}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_create_defaults_sync_to_square() {
        let input: CreateProductInput =
            serde_json::from_str(r#"{"name":"Walnut Spoon","price":"24.00"}"#).unwrap();
        assert!(input.sync_to_square);
        assert_eq!(input.quantity, 0);
        assert_eq!(input.status, ProductStatus::Active);
    }

    #[test]
    fn test_create_rejects_negative_quantity() {
        let input = CreateProductInput {
            name: "Felted Fox".to_string(),
            description: None,
            sku: Some("  ".to_string()),
            price: Decimal::from_str("18.00").unwrap(),
            quantity: -1,
            status: ProductStatus::Active,
            artist_id: None,
            category_id: None,
            sync_to_square: false,
        };
        assert_eq!(input.validate().unwrap_err().field, "quantity");
    }

    #[test]
    fn test_update_touches_catalog() {
        let update = UpdateProductInput {
            quantity: Some(4),
            ..Default::default()
        };
        assert!(!update.touches_catalog());

        let update = UpdateProductInput {
            price: Some(Decimal::from_str("30").unwrap()),
            ..Default::default()
        };
        assert!(update.touches_catalog());
    }

    #[test]
    fn test_adjust_rejects_zero() {
        let input = AdjustQuantityInput {
            delta: 0,
            reason: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_adjust_delta_bounds() {
        for delta in [i32::MAX, i32::MIN, MAX_QUANTITY + 1, -MAX_QUANTITY - 1] {
            let input = AdjustQuantityInput {
                delta,
                reason: None,
            };
            assert_eq!(input.validate().unwrap_err().field, "delta");
        }
        let input = AdjustQuantityInput {
            delta: -MAX_QUANTITY,
            reason: None,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_quantity_and_price_upper_bounds() {
        let update = UpdateProductInput {
            quantity: Some(MAX_QUANTITY + 1),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap_err().field, "quantity");

        let input: CreateProductInput =
            serde_json::from_str(r#"{"name":"Loom","price":"100000000"}"#).unwrap();
        assert_eq!(input.validate().unwrap_err().field, "price");
    }

    #[test]
    fn test_update_null_clears_references() {
        let update: UpdateProductInput =
            serde_json::from_str(r#"{"artist_id":null,"description":"  "}"#).unwrap();
        let update = update.validate().unwrap();
        assert_eq!(update.artist_id, Some(None));
        assert_eq!(update.description, Some(None));
        assert_eq!(update.category_id, None);
        assert_eq!(update.sku, None);

        let update: UpdateProductInput = serde_json::from_str(r#"{"category_id":7}"#).unwrap();
        assert_eq!(update.category_id, Some(Some(CategoryId::new(7))));
    }
}
