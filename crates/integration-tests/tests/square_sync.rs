//! Integration tests for Square conflict detection and webhook routing.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use maple_spruce_admin::models::{Product, SquareSnapshot};
use maple_spruce_admin::services::detect_conflicts;
use maple_spruce_admin::square::webhook::{
    WebhookAction, WebhookEvent, compute_signature, verify_signature,
};
use maple_spruce_core::{ConflictResolution, ConflictType, ProductId, ProductStatus, SyncConflictStatus};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn linked_product() -> Product {
    let now = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
    Product {
        id: ProductId::new(12),
        name: "Rosemaled Bowl".to_string(),
        description: None,
        sku: Some("RB-001".to_string()),
        price: dec("145.00"),
        quantity: 3,
        status: ProductStatus::Active,
        artist_id: None,
        category_id: None,
        square_item_id: Some("ITEM1".to_string()),
        square_variation_id: Some("VAR1".to_string()),
        square_snapshot: None,
        created_at: now,
        updated_at: now,
    }
}

fn snapshot(name: &str, price: &str, quantity: i32) -> SquareSnapshot {
    SquareSnapshot {
        name: name.to_string(),
        price: Some(dec(price)),
        quantity: Some(quantity),
        version: Some(7),
        fetched_at: Utc.with_ymd_and_hms(2026, 10, 2, 9, 0, 0).unwrap(),
    }
}

// =============================================================================
// Detection
// =============================================================================

#[test]
fn test_matching_product_has_no_conflicts() {
    let conflicts = detect_conflicts(
        &linked_product(),
        Some(&snapshot("Rosemaled Bowl ", "145", 3)),
    );
    assert!(conflicts.is_empty(), "{conflicts:?}");
}

#[test]
fn test_every_field_can_conflict_at_once() {
    let conflicts = detect_conflicts(
        &linked_product(),
        Some(&snapshot("rosemaled bowl", "150.00", 1)),
    );
    let types: Vec<ConflictType> = conflicts.iter().map(|c| c.conflict_type).collect();
    assert_eq!(
        types,
        vec![
            ConflictType::NameMismatch,
            ConflictType::PriceMismatch,
            ConflictType::QuantityMismatch
        ]
    );

    let quantity = &conflicts[2];
    assert_eq!(quantity.local_value, json!(3));
    assert_eq!(quantity.external_value, json!(1));
}

#[test]
fn test_missing_catalog_entry() {
    let conflicts = detect_conflicts(&linked_product(), None);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflict_type, ConflictType::MissingExternal);
    assert!(conflicts[0].external_value.is_null());
    assert_eq!(conflicts[0].local_value["name"], "Rosemaled Bowl");
}

#[test]
fn test_resolution_outcomes() {
    assert_eq!(
        ConflictResolution::UseLocal.target_status(),
        SyncConflictStatus::Resolved
    );
    assert_eq!(
        ConflictResolution::UseExternal.target_status(),
        SyncConflictStatus::Resolved
    );
    assert_eq!(
        ConflictResolution::Ignore.target_status(),
        SyncConflictStatus::Ignored
    );
}

// =============================================================================
// Webhooks
// =============================================================================

#[test]
fn test_inventory_webhook_targets_variations() {
    let event: WebhookEvent = serde_json::from_value(json!({
        "merchant_id": "M1",
        "type": "inventory.count.updated",
        "event_id": "0b1c",
        "data": {
            "type": "inventory_counts",
            "id": "x",
            "object": {
                "inventory_counts": [
                    {"catalog_object_id": "VAR2", "quantity": "4"},
                    {"catalog_object_id": "VAR1", "quantity": "2"},
                    {"catalog_object_id": "VAR2", "quantity": "4"}
                ]
            }
        }
    }))
    .unwrap();

    assert_eq!(
        event.action(),
        WebhookAction::CheckVariations(vec!["VAR1".to_string(), "VAR2".to_string()])
    );
}

#[test]
fn test_catalog_webhook_checks_everything() {
    let event: WebhookEvent = serde_json::from_value(json!({
        "type": "catalog.version.updated",
        "event_id": "77",
        "data": {"type": "catalog", "object": {"catalog_version": {"updated_at": "2026-10-02T10:00:00Z"}}}
    }))
    .unwrap();
    assert_eq!(event.action(), WebhookAction::CheckAll);
}

#[test]
fn test_signature_round_trip_rejects_tampering() {
    let body = br#"{"type":"inventory.count.updated","event_id":"1"}"#;
    let url = "https://admin.maplespruce.test/webhooks/square";
    let signature = compute_signature("key", url, body).unwrap();

    assert!(verify_signature("key", url, body, &signature).is_ok());
    assert!(verify_signature("key", url, b"{}", &signature).is_err());
    assert!(verify_signature("other-key", url, body, &signature).is_err());
}
