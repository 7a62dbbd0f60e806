//! Square webhook notifications.
//!
//! Square signs each notification with HMAC-SHA256 over the subscription's
//! notification URL followed by the raw request body, base64 encoded, and
//! sends it in the `x-square-hmacsha256-signature` header.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::SquareError;

/// Header carrying the notification signature.
pub const SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

pub const INVENTORY_COUNT_UPDATED: &str = "inventory.count.updated";
pub const CATALOG_VERSION_UPDATED: &str = "catalog.version.updated";

/// Compute the expected signature for a notification.
///
/// # Errors
///
/// Returns `SquareError::InvalidSignature` if the key cannot seed the MAC.
pub fn compute_signature(
    signature_key: &str,
    notification_url: &str,
    body: &[u8],
) -> Result<String, SquareError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(signature_key.as_bytes())
        .map_err(|_| SquareError::InvalidSignature)?;
    mac.update(notification_url.as_bytes());
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a notification signature.
///
/// # Errors
///
/// Returns `SquareError::InvalidSignature` if the signature does not match.
pub fn verify_signature(
    signature_key: &str,
    notification_url: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SquareError> {
    let expected = compute_signature(signature_key, notification_url, body)?;

    // Constant-time comparison
    if !constant_time_compare(&expected, signature.trim()) {
        return Err(SquareError::InvalidSignature);
    }

    tracing::debug!("Square signature verified");
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// A webhook notification. Only the fields we route on are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_id: String,
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub object: serde_json::Value,
}

/// What a notification asks us to re-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Inventory changed for these variations.
    CheckVariations(Vec<String>),
    /// Catalog changed somewhere; Square does not say which objects.
    CheckAll,
    Ignore,
}

impl WebhookEvent {
    /// Decide which products the event affects.
    #[must_use]
    pub fn action(&self) -> WebhookAction {
        match self.event_type.as_str() {
            INVENTORY_COUNT_UPDATED => {
                let mut ids: Vec<String> = self
                    .data
                    .object
                    .get("inventory_counts")
                    .and_then(serde_json::Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|count| count.get("catalog_object_id")?.as_str())
                    .map(str::to_string)
                    .collect();
                ids.sort();
                ids.dedup();
                if ids.is_empty() {
                    WebhookAction::Ignore
                } else {
                    WebhookAction::CheckVariations(ids)
                }
            }
            CATALOG_VERSION_UPDATED => WebhookAction::CheckAll,
            _ => WebhookAction::Ignore,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &str = "sq-sig-key-2f9Qk";
    const URL: &str = "https://api.maplespruce.org/webhooks/square";

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"type":"inventory.count.updated"}"#;
        let signature = compute_signature(KEY, URL, body).unwrap();
        assert!(verify_signature(KEY, URL, body, &signature).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let body = br#"{"type":"inventory.count.updated"}"#;
        let signature = compute_signature(KEY, URL, body).unwrap();

        assert!(verify_signature(KEY, URL, b"{}", &signature).is_err());
        assert!(verify_signature(KEY, "https://evil.example/hook", body, &signature).is_err());
        assert!(verify_signature("other-key", URL, body, &signature).is_err());
        assert!(verify_signature(KEY, URL, body, "").is_err());
    }

    #[test]
    fn test_signature_covers_url_then_body() {
        let joined = compute_signature(KEY, "", format!("{URL}{{}}").as_bytes()).unwrap();
        assert_eq!(compute_signature(KEY, URL, b"{}").unwrap(), joined);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_inventory_event_lists_variations() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{
                "merchant_id": "M1",
                "type": "inventory.count.updated",
                "event_id": "e1",
                "data": {
                    "type": "inventory",
                    "id": "x",
                    "object": {
                        "inventory_counts": [
                            {"catalog_object_id": "VAR2", "quantity": "3"},
                            {"catalog_object_id": "VAR1", "quantity": "1"},
                            {"catalog_object_id": "VAR2", "quantity": "3"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            event.action(),
            WebhookAction::CheckVariations(vec!["VAR1".to_string(), "VAR2".to_string()])
        );
    }

    #[test]
    fn test_catalog_and_unknown_events() {
        let catalog: WebhookEvent = serde_json::from_str(
            r#"{"type": "catalog.version.updated", "event_id": "e2", "data": {"object": {}}}"#,
        )
        .unwrap();
        assert_eq!(catalog.action(), WebhookAction::CheckAll);

        let payment: WebhookEvent =
            serde_json::from_str(r#"{"type": "payment.created", "event_id": "e3"}"#).unwrap();
        assert_eq!(payment.action(), WebhookAction::Ignore);
    }
}
