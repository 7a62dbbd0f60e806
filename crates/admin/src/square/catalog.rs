//! Catalog operations: one item with one variation per product.

use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::types::{
    CatalogItem, CatalogItemVariation, CatalogObject, DeleteCatalogObjectResponse, Money,
    RetrieveCatalogObjectResponse, UpsertCatalogObjectRequest, UpsertCatalogObjectResponse,
};
use super::{SquareClient, SquareError};

/// Temporary client ID for a new item; Square maps it to a real one.
const NEW_ITEM_ID: &str = "#item";
const NEW_VARIATION_ID: &str = "#variation";

/// What to write to Square for one product.
#[derive(Debug, Clone)]
pub struct CatalogItemSpec {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    /// Existing catalog item and variation, with their current versions.
    /// `None` creates a new item.
    pub existing: Option<ExistingItem>,
}

#[derive(Debug, Clone)]
pub struct ExistingItem {
    pub item_id: String,
    pub variation_id: String,
    pub item_version: Option<i64>,
    pub variation_version: Option<i64>,
}

/// Catalog IDs and version after an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedItem {
    pub item_id: String,
    pub variation_id: String,
    pub version: Option<i64>,
}

impl CatalogItemSpec {
    /// Build the `ITEM` object (with its nested variation) for an upsert.
    ///
    /// # Errors
    ///
    /// Returns `SquareError::Money` if the price cannot be expressed in cents.
    pub fn to_catalog_object(&self) -> Result<CatalogObject, SquareError> {
        let (item_id, variation_id, item_version, variation_version) = match &self.existing {
            Some(e) => (
                e.item_id.as_str(),
                e.variation_id.as_str(),
                e.item_version,
                e.variation_version,
            ),
            None => (NEW_ITEM_ID, NEW_VARIATION_ID, None, None),
        };

        let variation = CatalogObject {
            object_type: "ITEM_VARIATION".to_string(),
            id: variation_id.to_string(),
            version: variation_version,
            is_deleted: false,
            item_data: None,
            item_variation_data: Some(CatalogItemVariation {
                item_id: Some(item_id.to_string()),
                name: Some("Regular".to_string()),
                sku: self.sku.clone(),
                pricing_type: Some("FIXED_PRICING".to_string()),
                price_money: Some(Money::usd(self.price)?),
                track_inventory: Some(true),
            }),
        };

        Ok(CatalogObject {
            object_type: "ITEM".to_string(),
            id: item_id.to_string(),
            version: item_version,
            is_deleted: false,
            item_data: Some(CatalogItem {
                name: Some(self.name.clone()),
                description: self.description.clone(),
                variations: vec![variation],
            }),
            item_variation_data: None,
        })
    }
}

impl SquareClient {
    /// Create or update a catalog item and its variation.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` if the request fails or the response lacks the
    /// item or variation ID.
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    pub async fn upsert_item(&self, spec: &CatalogItemSpec) -> Result<UpsertedItem, SquareError> {
        let object = spec.to_catalog_object()?;
        let request = UpsertCatalogObjectRequest {
            idempotency_key: Uuid::new_v4().to_string(),
            object: &object,
        };

        let response: UpsertCatalogObjectResponse =
            self.post("/v2/catalog/object", &request).await?;
        upserted_ids(spec, response)
    }

    /// Retrieve an item with its variations. `Ok(None)` if it does not exist
    /// or has been deleted.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` for any failure other than not-found.
    #[instrument(skip(self))]
    pub async fn retrieve_item(&self, item_id: &str) -> Result<Option<CatalogObject>, SquareError> {
        let path = format!("/v2/catalog/object/{item_id}?include_related_objects=false");
        match self.get::<RetrieveCatalogObjectResponse>(&path).await {
            Ok(response) => Ok(response.object.filter(|o| !o.is_deleted)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete a catalog object (an item deletes its variations too).
    /// Deleting an object that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` for any failure other than not-found.
    #[instrument(skip(self))]
    pub async fn delete_object(&self, object_id: &str) -> Result<(), SquareError> {
        let path = format!("/v2/catalog/object/{object_id}");
        match self.delete::<DeleteCatalogObjectResponse>(&path).await {
            Ok(response) => {
                tracing::debug!(deleted = response.deleted_object_ids.len(), "catalog object deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn upserted_ids(
    spec: &CatalogItemSpec,
    response: UpsertCatalogObjectResponse,
) -> Result<UpsertedItem, SquareError> {
    let mapped = |client_id: &str| {
        response
            .id_mappings
            .iter()
            .find(|m| m.client_object_id == client_id)
            .map(|m| m.object_id.clone())
    };

    let (item_id, variation_id) = match &spec.existing {
        Some(e) => (e.item_id.clone(), e.variation_id.clone()),
        None => (
            mapped(NEW_ITEM_ID)
                .ok_or_else(|| SquareError::UnexpectedResponse("no item ID mapping".into()))?,
            mapped(NEW_VARIATION_ID).ok_or_else(|| {
                SquareError::UnexpectedResponse("no variation ID mapping".into())
            })?,
        ),
    };

    let version = response.catalog_object.and_then(|o| o.version);
    Ok(UpsertedItem {
        item_id,
        variation_id,
        version,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn spec(existing: Option<ExistingItem>) -> CatalogItemSpec {
        CatalogItemSpec {
            name: "Hand-dyed Wool Skein".to_string(),
            description: None,
            sku: Some("WOOL-7".to_string()),
            price: Decimal::from_str("19.99").unwrap(),
            existing,
        }
    }

    #[test]
    fn test_new_item_uses_client_ids() {
        let object = spec(None).to_catalog_object().unwrap();
        assert_eq!(object.id, "#item");
        let variation = &object.item_data.as_ref().unwrap().variations[0];
        assert_eq!(variation.id, "#variation");
        let data = variation.item_variation_data.as_ref().unwrap();
        assert_eq!(data.item_id.as_deref(), Some("#item"));
        assert_eq!(data.price_money.as_ref().unwrap().amount, 1999);
    }

    #[test]
    fn test_existing_item_carries_versions() {
        let object = spec(Some(ExistingItem {
            item_id: "ITEM1".to_string(),
            variation_id: "VAR1".to_string(),
            item_version: Some(5),
            variation_version: Some(6),
        }))
        .to_catalog_object()
        .unwrap();
        assert_eq!(object.id, "ITEM1");
        assert_eq!(object.version, Some(5));
        let variation = &object.item_data.unwrap().variations[0];
        assert_eq!(variation.version, Some(6));
    }

    #[test]
    fn test_upserted_ids_from_mappings() {
        let response: UpsertCatalogObjectResponse = serde_json::from_str(
            r##"{
                "catalog_object": {"type": "ITEM", "id": "REAL_ITEM", "version": 42},
                "id_mappings": [
                    {"client_object_id": "#item", "object_id": "REAL_ITEM"},
                    {"client_object_id": "#variation", "object_id": "REAL_VAR"}
                ]
            }"##,
        )
        .unwrap();
        let ids = upserted_ids(&spec(None), response).unwrap();
        assert_eq!(
            ids,
            UpsertedItem {
                item_id: "REAL_ITEM".to_string(),
                variation_id: "REAL_VAR".to_string(),
                version: Some(42),
            }
        );
    }

    #[test]
    fn test_missing_mapping_is_an_error() {
        let response: UpsertCatalogObjectResponse =
            serde_json::from_str(r#"{"catalog_object": null, "id_mappings": []}"#).unwrap();
        assert!(matches!(
            upserted_ids(&spec(None), response),
            Err(SquareError::UnexpectedResponse(_))
        ));
    }
}
