//! Square REST client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use super::SquareError;
use super::types::ErrorResponse;
use crate::config::SquareConfig;

/// Square API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SquareClient {
    inner: Arc<SquareClientInner>,
}

struct SquareClientInner {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
    api_version: String,
    location_id: String,
}

impl SquareClient {
    /// Create a client for the configured environment.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &SquareConfig) -> Self {
        Self::with_base_url(config, config.environment.base_url())
    }

    /// Create a client against a custom base URL (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_base_url(config: &SquareConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(SquareClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                access_token: config.access_token.clone(),
                api_version: config.api_version.clone(),
                location_id: config.location_id.clone(),
            }),
        }
    }

    /// The location whose inventory we manage.
    #[must_use]
    pub fn location_id(&self) -> &str {
        &self.inner.location_id
    }

    pub(super) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SquareError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    pub(super) async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SquareError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub(super) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, SquareError> {
        self.send::<(), T>(Method::DELETE, path, None).await
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `SquareError::RateLimited` on 429, `SquareError::Api` with
    /// Square's error list on any other non-success status, and
    /// `SquareError::Http`/`SquareError::Parse` on transport or decoding
    /// failures.
    #[instrument(skip(self, body), fields(status = tracing::field::Empty))]
    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, SquareError> {
        let url = format!("{}{path}", self.inner.base_url);

        let mut request = self
            .inner
            .client
            .request(method, &url)
            .bearer_auth(self.inner.access_token.expose_secret())
            .header("Square-Version", &self.inner.api_version)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(SquareError::RateLimited(retry_after));
        }

        let bytes = response.bytes().await?;

        if !status.is_success() {
            let errors = serde_json::from_slice::<ErrorResponse>(&bytes)
                .unwrap_or_default()
                .errors;
            return Err(SquareError::Api {
                status: status.as_u16(),
                errors,
            });
        }

        debug!(bytes = bytes.len(), "Square response received");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl std::fmt::Debug for SquareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareClient")
            .field("base_url", &self.inner.base_url)
            .field("api_version", &self.inner.api_version)
            .field("location_id", &self.inner.location_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
