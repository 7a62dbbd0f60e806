//! Square REST API wire types.
//!
//! Only the fields we read or write are modelled; Square ignores unknown
//! request fields and we ignore unknown response fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use maple_spruce_core::{CurrencyCode, Price, PriceError};

/// An entry of Square's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    pub category: String,
    pub code: String,
    pub detail: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// Square `Money`: an amount in the currency's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    /// Convert a decimal USD amount to cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` if the amount does not fit.
    pub fn usd(amount: Decimal) -> Result<Self, PriceError> {
        Ok(Self {
            amount: Price::usd(amount).to_cents()?,
            currency: CurrencyCode::USD.code().to_string(),
        })
    }

    /// Decimal amount in major units.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        let currency = self.currency.parse().unwrap_or_default();
        Price::from_cents(self.amount, currency).amount
    }
}

/// A catalog object. Only `ITEM` and `ITEM_VARIATION` are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_data: Option<CatalogItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_variation_data: Option<CatalogItemVariation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<CatalogObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogItemVariation {
    pub item_id: Option<String>,
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_inventory: Option<bool>,
}

impl CatalogObject {
    /// The first live variation of an item.
    #[must_use]
    pub fn first_variation(&self) -> Option<&Self> {
        self.item_data
            .as_ref()?
            .variations
            .iter()
            .find(|v| !v.is_deleted)
    }

    /// The variation with the given ID.
    #[must_use]
    pub fn variation(&self, variation_id: &str) -> Option<&Self> {
        self.item_data
            .as_ref()?
            .variations
            .iter()
            .find(|v| v.id == variation_id && !v.is_deleted)
    }

    #[must_use]
    pub fn item_name(&self) -> Option<&str> {
        self.item_data.as_ref()?.name.as_deref()
    }

    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.item_variation_data
            .as_ref()?
            .price_money
            .as_ref()
            .map(Money::to_decimal)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UpsertCatalogObjectRequest<'a> {
    pub idempotency_key: String,
    pub object: &'a CatalogObject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpsertCatalogObjectResponse {
    pub catalog_object: Option<CatalogObject>,
    #[serde(default)]
    pub id_mappings: Vec<IdMapping>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdMapping {
    pub client_object_id: String,
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RetrieveCatalogObjectResponse {
    pub object: Option<CatalogObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteCatalogObjectResponse {
    #[serde(default)]
    pub deleted_object_ids: Vec<String>,
}

/// Inventory count for one catalog object at one location.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryCount {
    pub catalog_object_id: String,
    pub location_id: String,
    pub state: String,
    /// Square sends quantities as decimal strings.
    pub quantity: String,
    pub calculated_at: Option<DateTime<Utc>>,
}

impl InventoryCount {
    /// Whole-unit quantity. Fractional counts are truncated.
    #[must_use]
    pub fn whole_quantity(&self) -> Option<i32> {
        let value: Decimal = self.quantity.parse().ok()?;
        value.trunc().to_i32()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRetrieveCountsRequest<'a> {
    pub catalog_object_ids: &'a [String],
    pub location_ids: [&'a str; 1],
    pub states: [&'static str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BatchRetrieveCountsResponse {
    #[serde(default)]
    pub counts: Vec<InventoryCount>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchChangeInventoryRequest {
    pub idempotency_key: String,
    pub changes: Vec<InventoryChange>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InventoryChange {
    #[serde(rename = "type")]
    pub change_type: &'static str,
    pub physical_count: PhysicalCount,
}

#[derive(Debug, Serialize)]
pub(crate) struct PhysicalCount {
    pub catalog_object_id: String,
    pub location_id: String,
    pub state: &'static str,
    pub quantity: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BatchChangeInventoryResponse {
    #[serde(default)]
    pub counts: Vec<InventoryCount>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_money_round_trips_cents() {
        let money = Money::usd(Decimal::from_str("24.50").unwrap()).unwrap();
        assert_eq!(money.amount, 2450);
        assert_eq!(money.currency, "USD");
        assert_eq!(money.to_decimal(), Decimal::from_str("24.50").unwrap());
    }

    #[test]
    fn test_parse_retrieved_item() {
        let json = r#"{
            "object": {
                "type": "ITEM",
                "id": "ITEM123",
                "version": 1700000000000,
                "is_deleted": false,
                "item_data": {
                    "name": "Birch Bark Basket",
                    "variations": [
                        {
                            "type": "ITEM_VARIATION",
                            "id": "OLD",
                            "is_deleted": true,
                            "item_variation_data": {"item_id": "ITEM123", "name": "Old"}
                        },
                        {
                            "type": "ITEM_VARIATION",
                            "id": "VAR456",
                            "version": 1700000000000,
                            "item_variation_data": {
                                "item_id": "ITEM123",
                                "name": "Regular",
                                "sku": "BB-01",
                                "pricing_type": "FIXED_PRICING",
                                "price_money": {"amount": 4800, "currency": "USD"}
                            }
                        }
                    ]
                }
            }
        }"#;
        let response: RetrieveCatalogObjectResponse = serde_json::from_str(json).unwrap();
        let item = response.object.unwrap();
        assert_eq!(item.item_name(), Some("Birch Bark Basket"));
        let variation = item.first_variation().unwrap();
        assert_eq!(variation.id, "VAR456");
        assert_eq!(variation.price(), Some(Decimal::from_str("48.00").unwrap()));
        assert!(item.variation("OLD").is_none());
    }

    #[test]
    fn test_inventory_quantity_parsing() {
        let count: InventoryCount = serde_json::from_str(
            r#"{"catalog_object_id":"VAR456","location_id":"L1","state":"IN_STOCK","quantity":"7"}"#,
        )
        .unwrap();
        assert_eq!(count.whole_quantity(), Some(7));

        let count = InventoryCount {
            quantity: "2.5".to_string(),
            ..count
        };
        assert_eq!(count.whole_quantity(), Some(2));
    }

    #[test]
    fn test_new_objects_skip_empty_fields() {
        let object = CatalogObject {
            object_type: "ITEM".to_string(),
            id: "#item".to_string(),
            version: None,
            is_deleted: false,
            item_data: Some(CatalogItem {
                name: Some("Spoon".to_string()),
                ..Default::default()
            }),
            item_variation_data: None,
        };
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["type"], "ITEM");
        assert!(json.get("version").is_none());
        assert!(json.get("is_deleted").is_none());
        assert!(json["item_data"].get("variations").is_none());
    }
}
