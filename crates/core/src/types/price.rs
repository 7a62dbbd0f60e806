//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as decimals in the currency's standard unit (dollars,
//! not cents). Square exchanges money as integer minor units, so this module
//! also owns the conversion in both directions.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting a price to minor units.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount does not fit in an `i64` number of cents.
    #[error("price {0} is out of range")]
    OutOfRange(Decimal),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD price.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Build a price from minor units (cents). Exact.
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency_code)
    }

    /// Convert to minor units, rounding half away from zero at 2 dp.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::OutOfRange` if the amount overflows `i64` cents.
    pub fn to_cents(&self) -> Result<i64, PriceError> {
        let cents = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::OutOfRange(self.amount))?;
        cents.to_i64().ok_or(PriceError::OutOfRange(self.amount))
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{}{:.2}", self.currency_code.symbol(), rounded)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    CAD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD => "$",
        }
    }

    /// Three-letter code as Square expects it.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::CAD => "CAD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "CAD" => Ok(Self::CAD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_cents_is_exact() {
        let price = Price::from_cents(4599, CurrencyCode::USD);
        assert_eq!(price.amount, Decimal::from_str("45.99").unwrap());
    }

    #[test]
    fn test_to_cents_rounds_half_away_from_zero() {
        let price = Price::usd(Decimal::from_str("10.005").unwrap());
        assert_eq!(price.to_cents().unwrap(), 1001);

        let price = Price::usd(Decimal::from_str("10.004").unwrap());
        assert_eq!(price.to_cents().unwrap(), 1000);
    }

    #[test]
    fn test_display() {
        let price = Price::usd(Decimal::from_str("7.5").unwrap());
        assert_eq!(price.to_string(), "$7.50");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(CurrencyCode::from_str("cad").unwrap(), CurrencyCode::CAD);
        assert!(CurrencyCode::from_str("EUR").is_err());
    }
}
