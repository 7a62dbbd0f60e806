//! Webflow Data API v2 client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::WebflowError;
use crate::config::WebflowConfig;

const WEBFLOW_API_URL: &str = "https://api.webflow.com";

/// Webflow API client.
#[derive(Clone)]
pub struct WebflowClient {
    inner: Arc<WebflowClientInner>,
}

struct WebflowClientInner {
    client: reqwest::Client,
    base_url: String,
    api_token: SecretString,
    classes_collection_id: String,
    artists_collection_id: String,
}

/// A CMS collection item as returned by Webflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub id: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub field_data: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemRequest<'a> {
    is_archived: bool,
    is_draft: bool,
    field_data: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
}

impl WebflowClient {
    /// Create a new Webflow client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(config: &WebflowConfig) -> Self {
        Self::with_base_url(config, WEBFLOW_API_URL)
    }

    /// Create a client against a custom base URL (used by tests).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_base_url(config: &WebflowConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(WebflowClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_token: config.api_token.clone(),
                classes_collection_id: config.classes_collection_id.clone(),
                artists_collection_id: config.artists_collection_id.clone(),
            }),
        }
    }

    #[must_use]
    pub fn classes_collection_id(&self) -> &str {
        &self.inner.classes_collection_id
    }

    #[must_use]
    pub fn artists_collection_id(&self) -> &str {
        &self.inner.artists_collection_id
    }

    /// Create and publish a collection item.
    ///
    /// # Errors
    ///
    /// Returns `WebflowError` if the request fails.
    #[instrument(skip(self, field_data))]
    pub async fn create_live_item(
        &self,
        collection_id: &str,
        field_data: &serde_json::Value,
    ) -> Result<CollectionItem, WebflowError> {
        let path = format!("/v2/collections/{collection_id}/items/live");
        let body = ItemRequest {
            is_archived: false,
            is_draft: false,
            field_data,
        };
        let bytes = self.send(Method::POST, &path, Some(&body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Update and republish a collection item.
    ///
    /// # Errors
    ///
    /// Returns `WebflowError::NotFound` if the item no longer exists.
    #[instrument(skip(self, field_data))]
    pub async fn update_live_item(
        &self,
        collection_id: &str,
        item_id: &str,
        field_data: &serde_json::Value,
    ) -> Result<CollectionItem, WebflowError> {
        let path = format!("/v2/collections/{collection_id}/items/{item_id}/live");
        let body = ItemRequest {
            is_archived: false,
            is_draft: false,
            field_data,
        };
        let bytes = self.send(Method::PATCH, &path, Some(&body)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Unpublish and delete a collection item. An item that is already gone
    /// counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns `WebflowError` for any failure other than not-found.
    #[instrument(skip(self))]
    pub async fn delete_live_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<(), WebflowError> {
        let path = format!("/v2/collections/{collection_id}/items/{item_id}/live");
        match self.send::<ItemRequest<'_>>(Method::DELETE, &path, None).await {
            Ok(_) | Err(WebflowError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, WebflowError> {
        let url = format!("{}{path}", self.inner.base_url);
        let mut request = self
            .inner
            .client
            .request(method, &url)
            .bearer_auth(self.inner.api_token.expose_secret())
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(WebflowError::RateLimited(retry_after));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(WebflowError::NotFound(path.to_string()));
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.message.or(b.msg))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(WebflowError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for WebflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebflowClient")
            .field("base_url", &self.inner.base_url)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{delete, post},
    };

    fn config() -> WebflowConfig {
        WebflowConfig {
            api_token: SecretString::from("wf-token-test"),
            classes_collection_id: "classes".to_string(),
            artists_collection_id: "artists".to_string(),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_create_live_item_sends_field_data() {
        let router = Router::new().route(
            "/v2/collections/{collection}/items/live",
            post(
                |Path(collection): Path<String>,
                 headers: HeaderMap,
                 Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(collection, "classes");
                    assert_eq!(headers["authorization"], "Bearer wf-token-test");
                    assert_eq!(body["isDraft"], false);
                    Json(serde_json::json!({
                        "id": "item-1",
                        "isDraft": false,
                        "isArchived": false,
                        "fieldData": body["fieldData"].clone(),
                    }))
                },
            ),
        );
        let base = serve(router).await;
        let client = WebflowClient::with_base_url(&config(), &base);

        let fields = serde_json::json!({"name": "Spoon Carving", "slug": "spoon-carving"});
        let item = client.create_live_item("classes", &fields).await.unwrap();
        assert_eq!(item.id, "item-1");
        assert_eq!(item.field_data["slug"], "spoon-carving");
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_ok() {
        let router = Router::new().route(
            "/v2/collections/{collection}/items/{item}/live",
            delete(|| async { StatusCode::NOT_FOUND }),
        );
        let base = serve(router).await;
        let client = WebflowClient::with_base_url(&config(), &base);

        assert!(client.delete_live_item("classes", "gone").await.is_ok());
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let router = Router::new().route(
            "/v2/collections/{collection}/items/live",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"message": "Validation Error"})),
                )
            }),
        );
        let base = serve(router).await;
        let client = WebflowClient::with_base_url(&config(), &base);

        let err = client
            .create_live_item("classes", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WebflowError::Api { status: 400, ref message } if message == "Validation Error"
        ));
    }
}
