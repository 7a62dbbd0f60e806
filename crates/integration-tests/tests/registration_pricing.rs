//! Integration tests for registration pricing and seat admission.
//!
//! These exercise the pure rules the registration service is built on,
//! using the admin models the same way the HTTP layer does.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use maple_spruce_admin::error::AppError;
use maple_spruce_admin::models::{Class, Discount};
use maple_spruce_admin::services::calculate_registration_cost;
use maple_spruce_admin::services::registrations::admission;
use maple_spruce_core::{
    ClassId, ClassStatus, DiscountId, DiscountRule, RecordStatus, RegistrationStatus,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, d, 12, 0, 0).unwrap()
}

fn spoon_carving() -> Class {
    Class {
        id: ClassId::new(8),
        title: "Spoon Carving".to_string(),
        description: None,
        category_id: None,
        instructor_id: None,
        starts_at: day(24),
        ends_at: day(25),
        capacity: 6,
        price: dec("62.50"),
        location: Some("Workshop B".to_string()),
        status: ClassStatus::Published,
        webflow_item_id: None,
        created_at: day(1),
        updated_at: day(1),
    }
}

fn discount(code: &str, rule: DiscountRule) -> Discount {
    Discount {
        id: DiscountId::new(2),
        name: code.to_string(),
        code: code.to_string(),
        description: None,
        rule,
        status: RecordStatus::Active,
        class_id: None,
        created_at: day(1),
        updated_at: day(1),
    }
}

// =============================================================================
// Cost
// =============================================================================

#[test]
fn test_percent_discount_on_multiple_seats() {
    let member = discount("MEMBER10", DiscountRule::Percent { percent: dec("10") });
    let quote = calculate_registration_cost(&spoon_carving(), 3, Some(&member), day(5)).unwrap();

    // 3 x 62.50 = 187.50; 10% = 18.75, taken once
    assert_eq!(quote.unit_price, dec("62.50"));
    assert_eq!(quote.subtotal, dec("187.50"));
    assert_eq!(quote.discount_amount, dec("18.75"));
    assert_eq!(quote.total, dec("168.75"));
    assert_eq!(quote.discount_id, Some(DiscountId::new(2)));
}

#[test]
fn test_percent_discount_rounds_half_away_from_zero() {
    let mut class = spoon_carving();
    class.price = dec("10.05");
    let odd = discount("ODD", DiscountRule::Percent { percent: dec("50") });
    let quote = calculate_registration_cost(&class, 1, Some(&odd), day(5)).unwrap();

    // 50% of 10.05 = 5.025 -> 5.03
    assert_eq!(quote.discount_amount, dec("5.03"));
    assert_eq!(quote.total, dec("5.02"));
}

#[test]
fn test_early_bird_depends_on_registration_time() {
    let early = discount(
        "EARLY",
        DiscountRule::AmountBeforeDate {
            amount: dec("15"),
            before: day(10),
        },
    );

    let before = calculate_registration_cost(&spoon_carving(), 1, Some(&early), day(9)).unwrap();
    assert_eq!(before.total, dec("47.50"));

    let after = calculate_registration_cost(&spoon_carving(), 1, Some(&early), day(11)).unwrap();
    assert_eq!(after.total, dec("62.50"));
}

#[test]
fn test_discount_scoped_to_another_class() {
    let mut scoped = discount("WEAVE", DiscountRule::Amount { amount: dec("5") });
    scoped.class_id = Some(ClassId::new(99));

    let err = calculate_registration_cost(&spoon_carving(), 1, Some(&scoped), day(5)).unwrap_err();
    assert_eq!(err.field, "discount_code");
}

#[test]
fn test_serialized_quote_uses_decimal_strings() {
    let quote = calculate_registration_cost(&spoon_carving(), 2, None, day(5)).unwrap();
    let json = serde_json::to_value(&quote).unwrap();
    assert_eq!(json["subtotal"], "125.00");
    assert_eq!(json["total"], "125.00");
    assert_eq!(json["class_id"], 8);
}

// =============================================================================
// Admission
// =============================================================================

#[test]
fn test_admission_fills_to_capacity() {
    assert_eq!(admission(6, 6, false).unwrap(), RegistrationStatus::Pending);
    assert!(matches!(admission(7, 6, false), Err(AppError::Conflict(_))));
}

#[test]
fn test_waitlist_only_when_requested() {
    assert_eq!(admission(2, 1, true).unwrap(), RegistrationStatus::Waitlisted);
    assert!(!RegistrationStatus::Waitlisted.holds_seats());
    assert!(RegistrationStatus::Pending.holds_seats());
    assert!(RegistrationStatus::Confirmed.holds_seats());
}

#[test]
fn test_only_published_classes_take_registrations() {
    for status in ClassStatus::ALL {
        assert_eq!(
            status.accepts_registrations(),
            *status == ClassStatus::Published,
            "{status}"
        );
    }
}
