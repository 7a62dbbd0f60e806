//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing with status and latency)
//! 3. API token guard (`/api` routes only, via `route_layer`)

pub mod auth;

pub use auth::require_api_token;
