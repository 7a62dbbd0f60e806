//! Class registration models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maple_spruce_core::{
    ClassId, DiscountId, Email, PaymentStatus, RegistrationId, RegistrationStatus,
};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, email_text, map_opt, nullable,
    nullable_text, optional_text, required_text,
};

/// Most seats a single registration may book.
pub const MAX_SEATS_PER_REGISTRATION: i32 = 20;

/// A student's registration for a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub class_id: ClassId,
    pub student_name: String,
    pub student_email: Email,
    pub student_phone: Option<String>,
    pub seats: i32,
    pub discount_id: Option<DiscountId>,
    /// Class price times seats, before any discount.
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_cost: Decimal,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub square_payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRegistrationInput {
    pub class_id: ClassId,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    #[serde(default = "default_seats")]
    pub seats: i32,
    pub discount_code: Option<String>,
    pub notes: Option<String>,
    /// Put the student on the waitlist instead of failing when the class is
    /// full.
    #[serde(default)]
    pub allow_waitlist: bool,
}

const fn default_seats() -> i32 {
    1
}

impl CreateRegistrationInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            student_name: required_text("student_name", &self.student_name, MAX_NAME_LENGTH)?,
            student_email: email_text("student_email", &self.student_email)?,
            student_phone: optional_text("student_phone", self.student_phone, 40)?,
            seats: seats(self.seats)?,
            discount_code: map_opt(
                optional_text("discount_code", self.discount_code, 40)?,
                |c| super::discount::normalize_code(&c),
            )?,
            notes: optional_text("notes", self.notes, MAX_TEXT_LENGTH)?,
            ..self
        })
    }
}

/// Partial registration update.
///
/// Seats and discount are fixed at creation so the stored cost always
/// matches what the student was quoted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRegistrationInput {
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub student_phone: Option<Option<String>>,
    pub status: Option<RegistrationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub square_payment_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl UpdateRegistrationInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            student_name: map_opt(self.student_name, |v| {
                required_text("student_name", &v, MAX_NAME_LENGTH)
            })?,
            student_email: map_opt(self.student_email, |v| email_text("student_email", &v))?,
            student_phone: nullable_text("student_phone", self.student_phone, 40)?,
            square_payment_id: optional_text("square_payment_id", self.square_payment_id, 100)?,
            notes: nullable_text("notes", self.notes, MAX_TEXT_LENGTH)?,
            ..self
        })
    }
}

/// Cost preview request.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub class_id: ClassId,
    #[serde(default = "default_seats")]
    pub seats: i32,
    pub discount_code: Option<String>,
}

impl QuoteRequest {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            class_id: self.class_id,
            seats: seats(self.seats)?,
            discount_code: map_opt(
                optional_text("discount_code", self.discount_code, 40)?,
                |c| super::discount::normalize_code(&c),
            )?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationFilter {
    pub class_id: Option<ClassId>,
    pub status: Option<RegistrationStatus>,
    pub payment_status: Option<PaymentStatus>,
}

fn seats(value: i32) -> Result<i32, ValidationError> {
    if !(1..=MAX_SEATS_PER_REGISTRATION).contains(&value) {
        return Err(ValidationError::new(
            "seats",
            format!("must be between 1 and {MAX_SEATS_PER_REGISTRATION}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let input: CreateRegistrationInput = serde_json::from_str(
            r#"{"class_id":3,"student_name":"June","student_email":"june@example.com"}"#,
        )
        .unwrap();
        assert_eq!(input.seats, 1);
        assert!(!input.allow_waitlist);
        assert!(input.discount_code.is_none());
    }

    #[test]
    fn test_discount_code_normalized() {
        let input: CreateRegistrationInput = serde_json::from_str(
            r#"{"class_id":3,"student_name":"June","student_email":"june@example.com","discount_code":" member10 "}"#,
        )
        .unwrap();
        assert_eq!(
            input.validate().unwrap().discount_code.as_deref(),
            Some("MEMBER10")
        );
    }

    #[test]
    fn test_blank_discount_code_is_ignored() {
        let request = QuoteRequest {
            class_id: ClassId::new(1),
            seats: 2,
            discount_code: Some("   ".to_string()),
        };
        assert!(request.validate().unwrap().discount_code.is_none());
    }

    #[test]
    fn test_seat_bounds() {
        let request = QuoteRequest {
            class_id: ClassId::new(1),
            seats: 0,
            discount_code: None,
        };
        assert_eq!(request.validate().unwrap_err().field, "seats");
    }
}
