//! Category domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maple_spruce_core::CategoryId;

use super::{
    MAX_TEXT_LENGTH, ValidationError, map_opt, nullable, nullable_text, optional_text,
    required_text,
};

/// A category shared by products and classes (e.g. "Weaving", "Pottery").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl CreateCategoryInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, 100)?,
            description: optional_text("description", self.description, MAX_TEXT_LENGTH)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl UpdateCategoryInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: map_opt(self.name, |v| required_text("name", &v, 100))?,
            description: nullable_text("description", self.description, MAX_TEXT_LENGTH)?,
        })
    }
}
