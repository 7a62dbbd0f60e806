//! Bearer token authentication for the JSON API.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::square::webhook::constant_time_compare;
use crate::state::AppState;

/// Reject requests whose `Authorization: Bearer <token>` header does not
/// match the configured API token.
///
/// Apply with `axum::middleware::from_fn_with_state` as a `route_layer`, so
/// unknown paths still 404 instead of 401.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the header is missing, malformed or
/// carries the wrong token.
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    if !constant_time_compare(token, state.config().api_token.expose_secret()) {
        tracing::warn!(path = %request.uri().path(), "Rejected API request with wrong token");
        return Err(AppError::Unauthorized("invalid API token".to_string()));
    }

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer  abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
