//! Artist domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maple_spruce_core::{ArtistId, Email, RecordStatus};

use super::{
    MAX_NAME_LENGTH, MAX_TEXT_LENGTH, ValidationError, email_text, map_opt, nullable,
    nullable_text, optional_text, required_text,
};

/// An artist whose work is sold through the collective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub bio: Option<String>,
    /// Share of each sale kept by the collective, between 0 and 1.
    pub commission_rate: Decimal,
    pub status: RecordStatus,
    /// Webflow CMS item, once the artist profile is published.
    pub webflow_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an artist.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArtistInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub commission_rate: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
}

impl CreateArtistInput {
    /// Validate and normalize the input.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("name", &self.name, MAX_NAME_LENGTH)?,
            email: email_text("email", &self.email)?,
            phone: optional_text("phone", self.phone, 40)?,
            bio: optional_text("bio", self.bio, MAX_TEXT_LENGTH)?,
            commission_rate: commission_rate(self.commission_rate)?,
            status: self.status,
        })
    }
}

/// Input for updating an artist. Absent fields are left unchanged; `null`
/// clears `phone` or `bio`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArtistInput {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    pub commission_rate: Option<Decimal>,
    pub status: Option<RecordStatus>,
}

impl UpdateArtistInput {
    /// Validate and normalize the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: map_opt(self.name, |v| required_text("name", &v, MAX_NAME_LENGTH))?,
            email: map_opt(self.email, |v| email_text("email", &v))?,
            phone: nullable_text("phone", self.phone, 40)?,
            bio: nullable_text("bio", self.bio, MAX_TEXT_LENGTH)?,
            commission_rate: map_opt(self.commission_rate, commission_rate)?,
            status: self.status,
        })
    }
}

/// Filter criteria for listing artists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistFilter {
    pub status: Option<RecordStatus>,
}

fn commission_rate(rate: Decimal) -> Result<Decimal, ValidationError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ValidationError::new(
            "commission_rate",
            "must be between 0 and 1",
        ));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input() -> CreateArtistInput {
        CreateArtistInput {
            name: "  Ada Birchwood ".to_string(),
            email: "Ada@Birchwood.Studio".to_string(),
            phone: Some(String::new()),
            bio: None,
            commission_rate: Decimal::from_str("0.35").unwrap(),
            status: RecordStatus::Active,
        }
    }

    #[test]
    fn test_create_normalizes() {
        let valid = input().validate().unwrap();
        assert_eq!(valid.name, "Ada Birchwood");
        assert_eq!(valid.email, "ada@birchwood.studio");
        assert_eq!(valid.phone, None);
    }

    #[test]
    fn test_commission_rate_range() {
        let mut bad = input();
        bad.commission_rate = Decimal::from_str("1.5").unwrap();
        assert_eq!(bad.validate().unwrap_err().field, "commission_rate");
    }

    #[test]
    fn test_update_only_checks_present_fields() {
        let update = UpdateArtistInput {
            bio: Some(Some("Turns bowls from local maple.".to_string())),
            ..Default::default()
        };
        let valid = update.validate().unwrap();
        assert!(valid.name.is_none());
        assert!(valid.email.is_none());

        let bad = UpdateArtistInput {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_update_null_clears_phone() {
        let update: UpdateArtistInput = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        let valid = update.validate().unwrap();
        assert_eq!(valid.phone, Some(None));
        assert_eq!(valid.bio, None);
    }
}
