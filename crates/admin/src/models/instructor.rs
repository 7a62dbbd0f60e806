//! Instructor domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maple_spruce_core::{Email, InstructorId, RecordStatus};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, email_text, map_opt, nullable,
    nullable_text, optional_text, required_text,
};

/// Most specialties an instructor may list.
const MAX_SPECIALTIES: usize = 20;

/// Someone who teaches classes at the collective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub bio: Option<String>,
    /// Crafts taught, e.g. "spoon carving".
    pub specialties: Vec<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInstructorInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl CreateInstructorInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, MAX_NAME_LENGTH)?,
            email: email_text("email", &self.email)?,
            phone: optional_text("phone", self.phone, 40)?,
            bio: optional_text("bio", self.bio, MAX_TEXT_LENGTH)?,
            specialties: specialties(self.specialties)?,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInstructorInput {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    pub specialties: Option<Vec<String>>,
    pub status: Option<RecordStatus>,
}

impl UpdateInstructorInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: map_opt(self.name, |v| required_text("name", &v, MAX_NAME_LENGTH))?,
            email: map_opt(self.email, |v| email_text("email", &v))?,
            phone: nullable_text("phone", self.phone, 40)?,
            bio: nullable_text("bio", self.bio, MAX_TEXT_LENGTH)?,
            specialties: map_opt(self.specialties, specialties)?,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructorFilter {
    pub status: Option<RecordStatus>,
}

/// Trim, drop blanks and duplicates, keep the caller's order.
fn specialties(values: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() || out.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        out.push(required_text("specialties", trimmed, 100)?);
    }
    if out.len() > MAX_SPECIALTIES {
        return Err(ValidationError::new(
            "specialties",
            format!("at most {MAX_SPECIALTIES} allowed"),
        ));
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_specialties_are_deduplicated() {
        let cleaned = specialties(vec![
            "Weaving".to_string(),
            " weaving ".to_string(),
            String::new(),
            "Natural dyes".to_string(),
        ])
        .unwrap();
        assert_eq!(cleaned, vec!["Weaving", "Natural dyes"]);
    }

    #[test]
    fn test_create_requires_email() {
        let input = CreateInstructorInput {
            name: "Tove".to_string(),
            email: " ".to_string(),
            phone: None,
            bio: None,
            specialties: vec![],
            status: RecordStatus::Active,
        };
        assert_eq!(input.validate().unwrap_err().field, "email");
    }
}
