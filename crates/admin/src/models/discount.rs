//! Discount code models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maple_spruce_core::{ClassId, DiscountId, DiscountRule, RecordStatus};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, map_opt, money, nullable, nullable_text,
    optional_text, required_text,
};

/// Longest discount code we accept.
const MAX_CODE_LENGTH: usize = 40;

/// A discount code students can enter when registering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    /// Upper-case code, unique across discounts.
    pub code: String,
    pub description: Option<String>,
    pub rule: DiscountRule,
    pub status: RecordStatus,
    /// When set, the code only applies to this class.
    pub class_id: Option<ClassId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// Whether the code may be used for a registration in `class_id`.
    #[must_use]
    pub fn applies_to(&self, class_id: ClassId) -> bool {
        self.status == RecordStatus::Active && self.class_id.is_none_or(|id| id == class_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDiscountInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub rule: DiscountRule,
    #[serde(default)]
    pub status: RecordStatus,
    pub class_id: Option<ClassId>,
}

impl CreateDiscountInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        rule(&self.rule)?;
        Ok(Self {
            name: required_text("name", &self.name, MAX_NAME_LENGTH)?,
            code: normalize_code(&self.code)?,
            description: optional_text("description", self.description, MAX_TEXT_LENGTH)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDiscountInput {
    pub name: Option<String>,
    pub code: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub rule: Option<DiscountRule>,
    pub status: Option<RecordStatus>,
    /// `null` makes a class-scoped code general again.
    #[serde(default, deserialize_with = "nullable")]
    pub class_id: Option<Option<ClassId>>,
}

impl UpdateDiscountInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if let Some(r) = &self.rule {
            rule(r)?;
        }
        Ok(Self {
            name: map_opt(self.name, |v| required_text("name", &v, MAX_NAME_LENGTH))?,
            code: map_opt(self.code, |v| normalize_code(&v))?,
            description: nullable_text("description", self.description, MAX_TEXT_LENGTH)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscountFilter {
    pub status: Option<RecordStatus>,
    pub class_id: Option<ClassId>,
}

/// Normalize a code the way students type it: trimmed and upper-cased.
///
/// # Errors
///
/// Rejects empty codes and codes with characters other than ASCII letters,
/// digits, `-` and `_`.
pub fn normalize_code(value: &str) -> Result<String, ValidationError> {
    let upper = required_text("code", value, MAX_CODE_LENGTH)?.to_ascii_uppercase();
    if !upper
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            "code",
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(upper)
}

fn rule(rule: &DiscountRule) -> Result<(), ValidationError> {
    rule.validate()
        .map_err(|e| ValidationError::new("rule", e.to_string()))?;
    let (_, value, _) = rule.to_parts();
    money("rule", value)?;
    Ok(())
}
