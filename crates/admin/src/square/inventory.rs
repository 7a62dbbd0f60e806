//! Inventory counts at the configured location.

use std::collections::HashMap;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::types::{
    BatchChangeInventoryRequest, BatchChangeInventoryResponse, BatchRetrieveCountsRequest,
    BatchRetrieveCountsResponse, InventoryChange, PhysicalCount,
};
use super::{SquareClient, SquareError};

const IN_STOCK: &str = "IN_STOCK";

impl SquareClient {
    /// In-stock counts for the given variations, keyed by variation ID.
    ///
    /// Variations Square has never counted are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` if any page of the request fails.
    #[instrument(skip(self, variation_ids), fields(count = variation_ids.len()))]
    pub async fn retrieve_counts(
        &self,
        variation_ids: &[String],
    ) -> Result<HashMap<String, i32>, SquareError> {
        let mut counts = HashMap::new();
        if variation_ids.is_empty() {
            return Ok(counts);
        }

        let mut cursor: Option<String> = None;
        loop {
            let request = BatchRetrieveCountsRequest {
                catalog_object_ids: variation_ids,
                location_ids: [self.location_id()],
                states: [IN_STOCK],
                cursor: cursor.take(),
            };
            let page: BatchRetrieveCountsResponse = self
                .post("/v2/inventory/counts/batch-retrieve", &request)
                .await?;

            for count in page.counts {
                let quantity = count.whole_quantity().ok_or_else(|| {
                    SquareError::UnexpectedResponse(format!(
                        "bad quantity '{}' for {}",
                        count.quantity, count.catalog_object_id
                    ))
                })?;
                counts.insert(count.catalog_object_id, quantity);
            }

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(counts)
    }

    /// In-stock count for one variation; zero when Square has no count.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` if the request fails.
    pub async fn retrieve_count(&self, variation_id: &str) -> Result<i32, SquareError> {
        let ids = [variation_id.to_string()];
        let counts = self.retrieve_counts(&ids).await?;
        Ok(counts.get(variation_id).copied().unwrap_or(0))
    }

    /// Overwrite the in-stock count of a variation with a physical count.
    ///
    /// # Errors
    ///
    /// Returns `SquareError` if the request fails.
    #[instrument(skip(self))]
    pub async fn set_physical_count(
        &self,
        variation_id: &str,
        quantity: i32,
    ) -> Result<(), SquareError> {
        let request = BatchChangeInventoryRequest {
            idempotency_key: Uuid::new_v4().to_string(),
            changes: vec![InventoryChange {
                change_type: "PHYSICAL_COUNT",
                physical_count: PhysicalCount {
                    catalog_object_id: variation_id.to_string(),
                    location_id: self.location_id().to_string(),
                    state: IN_STOCK,
                    quantity: quantity.to_string(),
                    occurred_at: Utc::now(),
                },
            }],
        };

        let response: BatchChangeInventoryResponse = self
            .post("/v2/inventory/changes/batch-create", &request)
            .await?;
        tracing::debug!(counts = response.counts.len(), "physical count recorded");
        Ok(())
    }
}
