//! Class (workshop) domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maple_spruce_core::{CategoryId, ClassId, ClassStatus, InstructorId};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, map_opt, money, nullable, nullable_text,
    optional_text, required_text,
};

/// A scheduled class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub instructor_id: Option<InstructorId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Seats available. Always positive.
    pub capacity: i32,
    /// Price per seat.
    pub price: Decimal,
    pub location: Option<String>,
    pub status: ClassStatus,
    /// Webflow CMS item while the class is published.
    pub webflow_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A class together with its current seat usage.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub seats_taken: i64,
    pub seats_remaining: i64,
}

impl ClassDetail {
    #[must_use]
    pub fn new(class: Class, seats_taken: i64) -> Self {
        let seats_remaining = (i64::from(class.capacity) - seats_taken).max(0);
        Self {
            class,
            seats_taken,
            seats_remaining,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClassInput {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub instructor_id: Option<InstructorId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub location: Option<String>,
}

impl CreateClassInput {
    /// Validate and normalize the input.
    ///
    /// New classes always start as drafts; use the publish endpoint to list
    /// them.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        schedule(self.starts_at, self.ends_at)?;
        Ok(Self {
            title: required_text("title", &self.title, MAX_NAME_LENGTH)?,
            description: optional_text("description", self.description, MAX_TEXT_LENGTH)?,
            capacity: capacity(self.capacity)?,
            price: money("price", self.price)?,
            location: optional_text("location", self.location, MAX_NAME_LENGTH)?,
            ..self
        })
    }
}

/// Partial class update. Status changes go through publish/unpublish/cancel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClassInput {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "nullable")]
    pub instructor_id: Option<Option<InstructorId>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    pub status: Option<ClassStatus>,
}

impl UpdateClassInput {
    /// Validate the present fields against each other and the stored class.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self, current: &Class) -> Result<Self, ValidationError> {
        schedule(
            self.starts_at.unwrap_or(current.starts_at),
            self.ends_at.unwrap_or(current.ends_at),
        )?;
        Ok(Self {
            title: map_opt(self.title, |v| required_text("title", &v, MAX_NAME_LENGTH))?,
            description: nullable_text("description", self.description, MAX_TEXT_LENGTH)?,
            capacity: map_opt(self.capacity, capacity)?,
            price: map_opt(self.price, |v| money("price", v))?,
            location: nullable_text("location", self.location, MAX_NAME_LENGTH)?,
            ..self
        })
    }

    /// Whether the change alters what the public site shows.
    #[must_use]
    pub const fn touches_listing(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.starts_at.is_some()
            || self.ends_at.is_some()
            || self.price.is_some()
            || self.location.is_some()
            || self.capacity.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassFilter {
    pub status: Option<ClassStatus>,
    pub instructor_id: Option<InstructorId>,
    pub category_id: Option<CategoryId>,
    /// Only classes starting after now.
    #[serde(default)]
    pub upcoming_only: bool,
}

fn schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ValidationError> {
    if ends_at <= starts_at {
        return Err(ValidationError::new("ends_at", "must be after starts_at"));
    }
    Ok(())
}

fn capacity(value: i32) -> Result<i32, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::new("capacity", "must be greater than 0"));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn class() -> Class {
        Class {
            id: ClassId::new(1),
            title: "Intro to Rug Hooking".to_string(),
            description: None,
            category_id: None,
            instructor_id: None,
            starts_at: Utc.with_ymd_and_hms(2026, 11, 7, 10, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 11, 7, 13, 0, 0).unwrap(),
            capacity: 8,
            price: Decimal::new(6500, 2),
            location: Some("Studio B".to_string()),
            status: ClassStatus::Draft,
            webflow_item_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_rejects_reversed_schedule() {
        let c = class();
        let input = CreateClassInput {
            title: c.title,
            description: None,
            category_id: None,
            instructor_id: None,
            starts_at: c.ends_at,
            ends_at: c.starts_at,
            capacity: 8,
            price: c.price,
            location: None,
        };
        assert_eq!(input.validate().unwrap_err().field, "ends_at");
    }

    #[test]
    fn test_update_checks_against_stored_schedule() {
        let current = class();
        let update = UpdateClassInput {
            ends_at: Some(Utc.with_ymd_and_hms(2026, 11, 7, 9, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(update.validate(&current).is_err());

        let update = UpdateClassInput {
            capacity: Some(0),
            ..Default::default()
        };
        assert_eq!(update.validate(&current).unwrap_err().field, "capacity");
    }

    #[test]
    fn test_update_null_clears_optional_fields() {
        let update: UpdateClassInput =
            serde_json::from_str(r#"{"instructor_id":null,"location":null,"category_id":3}"#)
                .unwrap();
        let update = update.validate(&class()).unwrap();
        assert_eq!(update.instructor_id, Some(None));
        assert_eq!(update.location, Some(None));
        assert_eq!(update.category_id, Some(Some(CategoryId::new(3))));
        assert_eq!(update.description, None);
        assert!(update.touches_listing());
    }

    #[test]
    fn test_detail_never_reports_negative_remaining() {
        let detail = ClassDetail::new(class(), 10);
        assert_eq!(detail.seats_remaining, 0);
        let detail = ClassDetail::new(class(), 3);
        assert_eq!(detail.seats_remaining, 5);
    }
}
