//! Domain models and request inputs.
//!
//! Each entity module holds the stored record, its create/update inputs and
//! its list filter. Inputs are validated (and normalized) before any write
//! with `validate(self) -> Result<Self, ValidationError>`.

pub mod artist;
pub mod category;
pub mod class;
pub mod discount;
pub mod instructor;
pub mod product;
pub mod registration;
pub mod sync_conflict;

pub use artist::*;
pub use category::*;
pub use class::*;
pub use discount::*;
pub use instructor::*;
pub use product::*;
pub use registration::*;
pub use sync_conflict::*;

use maple_spruce_core::Email;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Longest free-text name we accept.
pub const MAX_NAME_LENGTH: usize = 200;
/// Longest description/bio/notes field we accept.
pub const MAX_TEXT_LENGTH: usize = 10_000;
/// Largest amount a `NUMERIC(10,2)` money column holds.
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// A single invalid input field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trim a required text field and check it is non-empty and short enough.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field. Blank strings become `None`.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => required_text(field, &v, max).map(Some),
    }
}

/// Trim a nullable update field. `Some(None)` (an explicit `null`) and a
/// blank string both clear the column.
pub(crate) fn nullable_text(
    field: &'static str,
    value: Option<Option<String>>,
    max: usize,
) -> Result<Option<Option<String>>, ValidationError> {
    value.map(|v| optional_text(field, v, max)).transpose()
}

/// Deserialize a nullable update field so that an absent key stays `None`
/// and an explicit `null` becomes `Some(None)`.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Validate and normalize an email address, returning its canonical string.
pub(crate) fn email_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    Email::parse(value)
        .map(Email::into_inner)
        .map_err(|e| ValidationError::new(field, e.to_string()))
}

/// Money amounts must be non-negative, fit a money column and have at most
/// two decimal places.
pub(crate) fn money(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    if value > MAX_MONEY {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_MONEY}"),
        ));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new(
            field,
            "must have at most two decimal places",
        ));
    }
    Ok(value)
}

/// Apply `f` to an optional update field.
pub(crate) fn map_opt<T, U>(
    value: Option<T>,
    f: impl FnOnce(T) -> Result<U, ValidationError>,
) -> Result<Option<U>, ValidationError> {
    value.map(f).transpose()
}
