//! Registration cost calculation.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{Class, Discount, MAX_MONEY, MAX_SEATS_PER_REGISTRATION, ValidationError};
use maple_spruce_core::{ClassId, DiscountId};

/// Cost breakdown for a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationQuote {
    pub class_id: ClassId,
    pub seats: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub discount_id: Option<DiscountId>,
    pub discount_code: Option<String>,
}

/// Price `seats` seats of `class`, taking `discount` off the subtotal once.
///
/// The discount must be active and, when scoped to a class, scoped to this
/// one. Early-bird rules are evaluated at `at`.
///
/// # Errors
///
/// Returns a `ValidationError` on `seats` when the seat count is out of
/// range or the subtotal exceeds [`MAX_MONEY`], and on `discount_code` when
/// the discount does not apply.
pub fn calculate_registration_cost(
    class: &Class,
    seats: i32,
    discount: Option<&Discount>,
    at: DateTime<Utc>,
) -> Result<RegistrationQuote, ValidationError> {
    if !(1..=MAX_SEATS_PER_REGISTRATION).contains(&seats) {
        return Err(ValidationError::new(
            "seats",
            format!("must be between 1 and {MAX_SEATS_PER_REGISTRATION}"),
        ));
    }

    if let Some(discount) = discount
        && !discount.applies_to(class.id)
    {
        return Err(ValidationError::new(
            "discount_code",
            format!("{} cannot be used for this class", discount.code),
        ));
    }

    let subtotal = (class.price * Decimal::from(seats))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if subtotal > MAX_MONEY {
        return Err(ValidationError::new(
            "seats",
            format!("subtotal {subtotal} is more than a registration can record"),
        ));
    }
    let discount_amount = discount.map_or(Decimal::ZERO, |d| d.rule.discount_for(subtotal, at));

    Ok(RegistrationQuote {
        class_id: class.id,
        seats,
        unit_price: class.price,
        subtotal,
        discount_amount,
        total: subtotal - discount_amount,
        discount_id: discount.map(|d| d.id),
        discount_code: discount.map(|d| d.code.clone()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use maple_spruce_core::{ClassStatus, DiscountRule, RecordStatus};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, day, 9, 0, 0).unwrap()
    }

    fn class(price: &str) -> Class {
        Class {
            id: ClassId::new(1),
            title: "Norwegian Rosemaling".to_string(),
            description: None,
            category_id: None,
            instructor_id: None,
            starts_at: at(20),
            ends_at: at(21),
            capacity: 10,
            price: dec(price),
            location: None,
            status: ClassStatus::Published,
            webflow_item_id: None,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    fn discount(rule: DiscountRule) -> Discount {
        Discount {
            id: DiscountId::new(3),
            name: "Members".to_string(),
            code: "MEMBER".to_string(),
            description: None,
            rule,
            status: RecordStatus::Active,
            class_id: None,
            created_at: at(1),
            updated_at: at(1),
        }
    }

    #[test]
    fn test_no_discount() {
        let quote = calculate_registration_cost(&class("45.00"), 3, None, at(5)).unwrap();
        assert_eq!(quote.subtotal, dec("135.00"));
        assert_eq!(quote.discount_amount, Decimal::ZERO);
        assert_eq!(quote.total, dec("135.00"));
        assert!(quote.discount_code.is_none());
    }

    #[test]
    fn test_percent_applied_once_to_subtotal() {
        let d = discount(DiscountRule::Percent { percent: dec("15") });
        let quote = calculate_registration_cost(&class("45.00"), 3, Some(&d), at(5)).unwrap();
        // 15% of 135.00 = 20.25
        assert_eq!(quote.discount_amount, dec("20.25"));
        assert_eq!(quote.total, dec("114.75"));
        assert_eq!(quote.discount_code.as_deref(), Some("MEMBER"));
    }

    #[test]
    fn test_fixed_amount_applied_once() {
        let d = discount(DiscountRule::Amount { amount: dec("10") });
        let quote = calculate_registration_cost(&class("45.00"), 2, Some(&d), at(5)).unwrap();
        assert_eq!(quote.discount_amount, dec("10"));
        assert_eq!(quote.total, dec("80.00"));
    }

    #[test]
    fn test_amount_never_exceeds_subtotal() {
        let d = discount(DiscountRule::Amount { amount: dec("100") });
        let quote = calculate_registration_cost(&class("30.00"), 1, Some(&d), at(5)).unwrap();
        assert_eq!(quote.total, Decimal::ZERO);
    }

    #[test]
    fn test_early_bird_window() {
        let d = discount(DiscountRule::AmountBeforeDate {
            amount: dec("5"),
            before: at(10),
        });
        let early = calculate_registration_cost(&class("40.00"), 1, Some(&d), at(9)).unwrap();
        assert_eq!(early.total, dec("35.00"));

        let late = calculate_registration_cost(&class("40.00"), 1, Some(&d), at(10)).unwrap();
        assert_eq!(late.total, dec("40.00"));
        assert_eq!(late.discount_amount, Decimal::ZERO);
    }

    #[test]
    fn test_inactive_or_other_class_discount_rejected() {
        let mut d = discount(DiscountRule::Amount { amount: dec("5") });
        d.status = RecordStatus::Inactive;
        let err = calculate_registration_cost(&class("40.00"), 1, Some(&d), at(5)).unwrap_err();
        assert_eq!(err.field, "discount_code");

        let mut d = discount(DiscountRule::Amount { amount: dec("5") });
        d.class_id = Some(ClassId::new(99));
        assert!(calculate_registration_cost(&class("40.00"), 1, Some(&d), at(5)).is_err());

        d.class_id = Some(ClassId::new(1));
        assert!(calculate_registration_cost(&class("40.00"), 1, Some(&d), at(5)).is_ok());
    }

    #[test]
    fn test_subtotal_must_fit_money_column() {
        let err = calculate_registration_cost(&class("99999999.99"), 2, None, at(5)).unwrap_err();
        assert_eq!(err.field, "seats");

        let quote = calculate_registration_cost(&class("49999999.99"), 2, None, at(5)).unwrap();
        assert_eq!(quote.subtotal, dec("99999999.98"));
    }

    #[test]
    fn test_seat_bounds() {
        assert!(calculate_registration_cost(&class("40.00"), 0, None, at(5)).is_err());
        assert!(
            calculate_registration_cost(&class("40.00"), MAX_SEATS_PER_REGISTRATION + 1, None, at(5))
                .is_err()
        );
    }
}
