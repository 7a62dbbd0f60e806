//! Webflow CMS client.
//!
//! Published classes and artist profiles are mirrored into Webflow CMS
//! collections so they appear on the public site. Items are written through
//! the `/items/live` endpoints, which publish immediately.

mod client;

pub use client::{CollectionItem, WebflowClient};

use thiserror::Error;

/// Errors that can occur when talking to Webflow.
#[derive(Debug, Error)]
pub enum WebflowError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Webflow answered with an error.
    #[error("Webflow API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Item not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Webflow.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}
