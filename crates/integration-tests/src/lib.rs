//! Shared fixtures for Maple & Spruce integration tests.
//!
//! Router tests run without a database: the pool connects lazily, so any
//! request that is rejected by auth or validation never touches Postgres.
//! Tests in `admin_database.rs` use `#[sqlx::test]`, which creates a fresh
//! migrated database per test on the server named by `DATABASE_URL`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p maple-spruce-integration-tests
//! DATABASE_URL=postgres://localhost/postgres \
//!     cargo test -p maple-spruce-integration-tests -- --ignored
//! ```

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use maple_spruce_admin::config::{
    AdminConfig, SquareConfig, SquareEnvironment, SquareWebhookConfig,
};
use maple_spruce_admin::square::SquareClient;
use maple_spruce_admin::state::AppState;

/// API token accepted by [`test_app`].
pub const API_TOKEN: &str = "k3J9xQ2mV7pL4wR8tY1nB6cF0hD5sG2a";
/// Square webhook signature key configured by [`test_app`].
pub const WEBHOOK_KEY: &str = "whsec-test-7Hq2Lm9Xc4Vb";
/// Notification URL configured by [`test_app`].
pub const WEBHOOK_URL: &str = "https://admin.maplespruce.test/webhooks/square";

/// Configuration with fixed secrets and no optional integrations.
#[must_use]
pub fn test_config() -> AdminConfig {
    AdminConfig {
        database_url: SecretString::from("postgres://localhost:1/maple_spruce_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        api_token: SecretString::from(API_TOKEN),
        square: SquareConfig {
            access_token: SecretString::from("sq-test-token"),
            location_id: "LOC-TEST".to_string(),
            environment: SquareEnvironment::Sandbox,
            api_version: "2025-10-16".to_string(),
            webhook: Some(SquareWebhookConfig {
                signature_key: SecretString::from(WEBHOOK_KEY),
                notification_url: WEBHOOK_URL.to_string(),
            }),
        },
        webflow: None,
        email: None,
        sync_concurrency: 2,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The full admin router over a lazily connected pool.
///
/// Square points at a closed local port so an accidental call fails fast.
///
/// # Panics
///
/// Panics if the lazy pool cannot be built from the URL.
#[must_use]
pub fn test_app(config: AdminConfig) -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy("postgres://localhost:1/maple_spruce_test")
        .expect("lazy pool");
    let square = SquareClient::with_base_url(&config.square, "http://127.0.0.1:1");
    let state = AppState::with_clients(config, pool, square, None, None);
    maple_spruce_admin::app(state)
}

/// The full admin router over a real database pool.
///
/// Square points at a closed local port, so only paths that never reach
/// Square (unlinked products, conflict ignores) can succeed.
#[must_use]
pub fn app_with_pool(pool: PgPool) -> Router {
    let config = test_config();
    let square = SquareClient::with_base_url(&config.square, "http://127.0.0.1:1");
    let state = AppState::with_clients(config, pool, square, None, None);
    maple_spruce_admin::app(state)
}

/// Send one request through the router and decode the JSON body
/// (`Value::Null` for empty or non-JSON bodies).
///
/// # Panics
///
/// Panics if the router fails or the body cannot be read.
pub async fn send(app: Router, request: Request<Body>) -> (Response<Body>, serde_json::Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (Response::from_parts(parts, Body::empty()), json)
}

/// Build an authenticated JSON request.
///
/// # Panics
///
/// Panics if the method or URI is invalid.
#[must_use]
pub fn api_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}
