//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Unauthenticated
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (database)
//! POST   /webhooks/square                     - Square notifications (signed)
//!
//! # Bearer token required
//! GET    /api/artists                         - List (?status=)
//! POST   /api/artists                         - Create
//! GET    /api/artists/{id}                    - Get
//! PATCH  /api/artists/{id}                    - Partial update
//! DELETE /api/artists/{id}                    - Delete (409 while products reference it)
//! POST   /api/artists/{id}/publish            - Publish profile to Webflow
//! POST   /api/artists/{id}/unpublish          - Remove profile from Webflow
//!
//! GET|POST          /api/categories
//! GET|PATCH|DELETE  /api/categories/{id}
//!
//! GET|POST          /api/instructors
//! GET|PATCH|DELETE  /api/instructors/{id}
//!
//! GET|POST          /api/products                 (?status=&artist_id=&category_id=&low_stock=)
//! GET|PATCH|DELETE  /api/products/{id}
//! POST              /api/products/{id}/adjust     - Relative stock change
//!
//! GET|POST          /api/classes                  (?status=&instructor_id=&category_id=&upcoming_only=)
//! GET|PATCH|DELETE  /api/classes/{id}
//! POST              /api/classes/{id}/publish
//! POST              /api/classes/{id}/unpublish   (?status=draft|cancelled|completed)
//!
//! POST              /api/registrations/quote
//! GET|POST          /api/registrations            (?class_id=&status=&payment_status=)
//! GET|PATCH|DELETE  /api/registrations/{id}
//! POST              /api/registrations/{id}/cancel
//!
//! GET|POST          /api/discounts                (?status=&class_id=)
//! GET               /api/discounts/by-code/{code}
//! GET|PATCH|DELETE  /api/discounts/{id}
//!
//! POST   /api/sync/check                      - Check all linked products
//! POST   /api/sync/check/{product_id}         - Check one product
//! GET    /api/sync/conflicts                  - List (?status=&product_id=)
//! GET    /api/sync/conflicts/{id}
//! POST   /api/sync/conflicts/{id}/resolve
//! ```

pub mod artists;
pub mod categories;
pub mod classes;
pub mod discounts;
pub mod instructors;
pub mod products;
pub mod registrations;
pub mod sync_conflicts;
pub mod webhooks;

use axum::{Router, middleware};

use crate::middleware::require_api_token;
use crate::state::AppState;

/// Build the `/api` router and the webhook endpoint.
///
/// `state` is needed up front so the token guard can read the configured
/// token.
pub fn routes(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .merge(artists::router())
        .merge(categories::router())
        .merge(instructors::router())
        .merge(products::router())
        .merge(classes::router())
        .merge(registrations::router())
        .merge(discounts::router())
        .merge(sync_conflicts::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ));

    Router::new()
        .nest("/api", api)
        .merge(webhooks::router())
}
