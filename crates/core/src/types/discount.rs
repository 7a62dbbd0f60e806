//! Discount rules.
//!
//! A discount is one of three shapes: a percentage off, a fixed amount off,
//! or a fixed amount off that only applies before a cutoff (early-bird
//! pricing for classes). Discounts apply once to a subtotal and never take it
//! below zero.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for a [`DiscountRule`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountRuleError {
    #[error("percent must be greater than 0 and at most 100 (got {0})")]
    PercentOutOfRange(Decimal),
    #[error("amount must be greater than 0 (got {0})")]
    NonPositiveAmount(Decimal),
    #[error("amount_before_date discounts require a cutoff date")]
    MissingCutoff,
}

/// Storage discriminant for [`DiscountRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "discount_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Amount,
    AmountBeforeDate,
}

/// How much a discount takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    /// Percentage of the subtotal, `0 < percent <= 100`.
    Percent { percent: Decimal },
    /// Fixed amount off the subtotal.
    Amount { amount: Decimal },
    /// Fixed amount off when evaluated strictly before `before`.
    AmountBeforeDate {
        amount: Decimal,
        before: DateTime<Utc>,
    },
}

impl DiscountRule {
    /// Rebuild a rule from its stored columns.
    ///
    /// # Errors
    ///
    /// Returns `DiscountRuleError::MissingCutoff` for an `AmountBeforeDate`
    /// row without a cutoff, or any error from [`DiscountRule::validate`].
    pub fn from_parts(
        kind: DiscountKind,
        value: Decimal,
        before: Option<DateTime<Utc>>,
    ) -> Result<Self, DiscountRuleError> {
        let rule = match kind {
            DiscountKind::Percent => Self::Percent { percent: value },
            DiscountKind::Amount => Self::Amount { amount: value },
            DiscountKind::AmountBeforeDate => Self::AmountBeforeDate {
                amount: value,
                before: before.ok_or(DiscountRuleError::MissingCutoff)?,
            },
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Split into `(kind, value, cutoff)` columns.
    #[must_use]
    pub fn to_parts(&self) -> (DiscountKind, Decimal, Option<DateTime<Utc>>) {
        match *self {
            Self::Percent { percent } => (DiscountKind::Percent, percent, None),
            Self::Amount { amount } => (DiscountKind::Amount, amount, None),
            Self::AmountBeforeDate { amount, before } => {
                (DiscountKind::AmountBeforeDate, amount, Some(before))
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> DiscountKind {
        self.to_parts().0
    }

    /// Check the rule's value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first range violation found.
    pub fn validate(&self) -> Result<(), DiscountRuleError> {
        match *self {
            Self::Percent { percent } => {
                if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                    return Err(DiscountRuleError::PercentOutOfRange(percent));
                }
            }
            Self::Amount { amount } | Self::AmountBeforeDate { amount, .. } => {
                if amount <= Decimal::ZERO {
                    return Err(DiscountRuleError::NonPositiveAmount(amount));
                }
            }
        }
        Ok(())
    }

    /// Amount taken off `subtotal` when evaluated at `at`.
    ///
    /// Rounded to cents (midpoint away from zero) and capped at `subtotal`.
    /// A non-positive subtotal always yields zero.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal, at: DateTime<Utc>) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let raw = match *self {
            Self::Percent { percent } => subtotal * percent / Decimal::ONE_HUNDRED,
            Self::Amount { amount } => amount,
            Self::AmountBeforeDate { amount, before } => {
                if at < before {
                    amount
                } else {
                    Decimal::ZERO
                }
            }
        };

        raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, subtotal)
    }

    /// `subtotal` after the discount is taken off.
    #[must_use]
    pub fn apply(&self, subtotal: Decimal, at: DateTime<Utc>) -> Decimal {
        subtotal - self.discount_for(subtotal, at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_percent_rounds_to_cents() {
        let rule = DiscountRule::Percent { percent: dec("15") };
        // 15% of 33.33 = 4.9995 -> 5.00
        assert_eq!(rule.discount_for(dec("33.33"), at(1)), dec("5.00"));
        assert_eq!(rule.apply(dec("33.33"), at(1)), dec("28.33"));
    }

    #[test]
    fn test_amount_never_goes_negative() {
        let rule = DiscountRule::Amount { amount: dec("50") };
        assert_eq!(rule.apply(dec("30"), at(1)), Decimal::ZERO);
        assert_eq!(rule.discount_for(dec("30"), at(1)), dec("30"));
    }

    #[test]
    fn test_amount_before_date_cutoff_is_exclusive() {
        let rule = DiscountRule::AmountBeforeDate {
            amount: dec("10"),
            before: at(10),
        };
        assert_eq!(rule.apply(dec("80"), at(9)), dec("70"));
        assert_eq!(rule.apply(dec("80"), at(10)), dec("80"));
        assert_eq!(rule.apply(dec("80"), at(11)), dec("80"));
    }

    #[test]
    fn test_zero_subtotal() {
        let rule = DiscountRule::Percent { percent: dec("100") };
        assert_eq!(rule.discount_for(Decimal::ZERO, at(1)), Decimal::ZERO);
    }

    #[test]
    fn test_validate() {
        assert!(DiscountRule::Percent { percent: dec("0") }.validate().is_err());
        assert!(DiscountRule::Percent { percent: dec("100.01") }.validate().is_err());
        assert!(DiscountRule::Percent { percent: dec("100") }.validate().is_ok());
        assert!(DiscountRule::Amount { amount: dec("-1") }.validate().is_err());
    }

    #[test]
    fn test_parts_round_trip() {
        let rule = DiscountRule::AmountBeforeDate {
            amount: dec("12.50"),
            before: at(5),
        };
        let (kind, value, before) = rule.to_parts();
        assert_eq!(DiscountRule::from_parts(kind, value, before).unwrap(), rule);

        assert_eq!(
            DiscountRule::from_parts(DiscountKind::AmountBeforeDate, dec("5"), None),
            Err(DiscountRuleError::MissingCutoff)
        );
    }

    #[test]
    fn test_serde_shape() {
        let rule: DiscountRule =
            serde_json::from_str(r#"{"kind":"percent","percent":"20"}"#).unwrap();
        assert_eq!(rule, DiscountRule::Percent { percent: dec("20") });
    }
}
