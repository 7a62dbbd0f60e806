//! Inbound Square webhooks.
//!
//! Notifications are verified against the subscription's signature key and
//! acknowledged right away; the conflict checks they trigger run in the
//! background so Square does not time out and retry.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::square::webhook::{SIGNATURE_HEADER, WebhookAction, WebhookEvent, verify_signature};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/square", post(square))
}

#[instrument(skip_all)]
async fn square(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let Some(webhook) = &state.config().square.webhook else {
        return Err(AppError::NotFound(
            "Square webhooks are not configured".to_string(),
        ));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Square signature".to_string()))?;

    if verify_signature(
        webhook.signature_key.expose_secret(),
        &webhook.notification_url,
        &body,
        signature,
    )
    .is_err()
    {
        warn!("Rejected Square webhook with bad signature");
        return Err(AppError::Unauthorized("invalid Square signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook payload: {e}")))?;
    let action = event.action();
    info!(
        event_type = %event.event_type,
        event_id = %event.event_id,
        ?action,
        "Square webhook received"
    );

    let sync = state.sync();
    match action {
        WebhookAction::Ignore => {}
        WebhookAction::CheckVariations(variation_ids) => {
            tokio::spawn(async move {
                if let Err(e) = sync.check_variations(&variation_ids).await {
                    warn!(error = %e, "Webhook-triggered sync check failed");
                }
            });
        }
        WebhookAction::CheckAll => {
            tokio::spawn(async move {
                if let Err(e) = sync.check_all_products().await {
                    warn!(error = %e, "Webhook-triggered full sync check failed");
                }
            });
        }
    }

    Ok(StatusCode::OK)
}
