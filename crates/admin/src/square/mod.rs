//! Square API client (catalog, inventory, webhooks).
//!
//! Square is the point of sale for the collective's shop. Products created
//! here are pushed to the Square catalog as an item with a single variation;
//! the variation carries the price, the SKU and the inventory count.
//!
//! # Example
//!
//! ```rust,ignore
//! use maple_spruce_admin::square::{CatalogItemSpec, SquareClient};
//!
//! let client = SquareClient::new(&config.square);
//!
//! let item = client.upsert_item(&CatalogItemSpec { /* ... */ }).await?;
//! client.set_physical_count(&item.variation_id, 12).await?;
//! ```

mod catalog;
mod client;
mod inventory;
pub mod types;
pub mod webhook;

pub use catalog::{CatalogItemSpec, ExistingItem, UpsertedItem};
pub use client::SquareClient;
pub use types::*;

use maple_spruce_core::PriceError;
use thiserror::Error;

/// Errors that can occur when talking to Square.
#[derive(Debug, Error)]
pub enum SquareError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Square answered with an error list.
    #[error("Square API error ({status}): {}", format_api_errors(.errors))]
    Api {
        status: u16,
        errors: Vec<ApiErrorDetail>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Square.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A money amount could not be expressed in cents.
    #[error("Invalid money amount: {0}")]
    Money(#[from] PriceError),

    /// Square returned something we did not expect.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Webhook signature missing or wrong.
    #[error("Invalid webhook signature")]
    InvalidSignature,
}

impl SquareError {
    /// Whether the error means the requested object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, errors } => {
                *status == 404 || errors.iter().any(|e| e.code == "NOT_FOUND")
            }
            _ => false,
        }
    }
}

fn format_api_errors(errors: &[ApiErrorDetail]) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(|e| match &e.detail {
            Some(detail) => format!("{}: {detail}", e.code),
            None => e.code.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
