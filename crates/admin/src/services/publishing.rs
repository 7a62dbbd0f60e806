//! Public site publishing through the Webflow CMS.
//!
//! Classes are always publishable; without Webflow configured, publishing
//! only changes the class status. Artist profiles exist only on Webflow, so
//! publishing an artist requires it.

use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::{ArtistRepository, ClassRepository};
use crate::error::AppError;
use crate::models::{Artist, Class, ClassDetail};
use crate::webflow::{WebflowClient, WebflowError};
use maple_spruce_core::{ArtistId, ClassId, ClassStatus, RecordStatus};

/// URL slug: lowercase ASCII letters and digits separated by single hyphens.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// CMS field data for a class listing.
#[must_use]
pub fn class_fields(detail: &ClassDetail) -> Value {
    let class = &detail.class;
    json!({
        "name": class.title,
        "slug": format!("{}-{}", slugify(&class.title), class.id),
        "description": class.description.as_deref().unwrap_or_default(),
        "starts-at": class.starts_at.to_rfc3339(),
        "ends-at": class.ends_at.to_rfc3339(),
        "price": class.price.to_string(),
        "location": class.location.as_deref().unwrap_or_default(),
        "capacity": class.capacity,
        "seats-remaining": detail.seats_remaining,
    })
}

/// CMS field data for an artist profile. Contact details stay private.
#[must_use]
pub fn artist_fields(artist: &Artist) -> Value {
    json!({
        "name": artist.name,
        "slug": format!("{}-{}", slugify(&artist.name), artist.id),
        "bio": artist.bio.as_deref().unwrap_or_default(),
    })
}

/// Publishes classes and artists to the public site.
pub struct PublishingService {
    pool: PgPool,
    webflow: Option<WebflowClient>,
}

impl PublishingService {
    #[must_use]
    pub const fn new(pool: PgPool, webflow: Option<WebflowClient>) -> Self {
        Self { pool, webflow }
    }

    fn classes(&self) -> ClassRepository<'_> {
        ClassRepository::new(&self.pool)
    }

    /// Mark a class published and list it on the public site.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` for cancelled or completed classes and
    /// `AppError::Webflow` if the listing could not be written (the class
    /// status is left unchanged then).
    #[instrument(skip(self))]
    pub async fn publish_class(&self, id: ClassId) -> Result<Class, AppError> {
        let detail = self
            .classes()
            .get_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))?;

        if matches!(
            detail.class.status,
            ClassStatus::Cancelled | ClassStatus::Completed
        ) {
            return Err(AppError::Conflict(format!(
                "class {id} is {} and cannot be published",
                detail.class.status
            )));
        }

        let item_id = match &self.webflow {
            Some(webflow) => Some(
                upsert_item(
                    webflow,
                    webflow.classes_collection_id(),
                    detail.class.webflow_item_id.as_deref(),
                    &class_fields(&detail),
                )
                .await?,
            ),
            None => detail.class.webflow_item_id.clone(),
        };

        let class = self
            .classes()
            .set_publication(id, ClassStatus::Published, item_id.as_deref())
            .await?;
        info!(class_id = %id, webflow_item_id = ?class.webflow_item_id, "Class published");
        Ok(class)
    }

    /// Move a class away from `published` and take its listing down.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Webflow` if the listing could not be removed.
    #[instrument(skip(self))]
    pub async fn unpublish_class(&self, id: ClassId, status: ClassStatus) -> Result<Class, AppError> {
        if status == ClassStatus::Published {
            return Err(AppError::BadRequest(
                "unpublish needs a status other than published".into(),
            ));
        }

        let class = self
            .classes()
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))?;

        self.remove_class_listing(&class).await?;
        let class = self.classes().set_publication(id, status, None).await?;
        info!(class_id = %id, status = %status, "Class unpublished");
        Ok(class)
    }

    /// Rewrite the listing of a published class after an edit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Webflow` if the listing could not be written.
    pub async fn refresh_class(&self, id: ClassId) -> Result<(), AppError> {
        let Some(webflow) = &self.webflow else {
            return Ok(());
        };
        let Some(detail) = self.classes().get_detail(id).await? else {
            return Ok(());
        };
        if detail.class.status != ClassStatus::Published {
            return Ok(());
        }

        let item_id = upsert_item(
            webflow,
            webflow.classes_collection_id(),
            detail.class.webflow_item_id.as_deref(),
            &class_fields(&detail),
        )
        .await?;
        if detail.class.webflow_item_id.as_deref() != Some(item_id.as_str()) {
            self.classes()
                .set_publication(id, ClassStatus::Published, Some(&item_id))
                .await?;
        }
        Ok(())
    }

    /// Delete a class's Webflow item, if it has one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Webflow` if Webflow refused the delete.
    pub async fn remove_class_listing(&self, class: &Class) -> Result<(), AppError> {
        match (&self.webflow, &class.webflow_item_id) {
            (Some(webflow), Some(item_id)) => {
                webflow
                    .delete_live_item(webflow.classes_collection_id(), item_id)
                    .await?;
            }
            (None, Some(item_id)) => {
                warn!(class_id = %class.id, item_id, "Webflow not configured; listing left in place");
            }
            _ => {}
        }
        Ok(())
    }

    /// Publish (or refresh) an artist profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when Webflow is not configured and
    /// `AppError::Conflict` for inactive artists.
    #[instrument(skip(self))]
    pub async fn publish_artist(&self, id: ArtistId) -> Result<Artist, AppError> {
        let webflow = self.require_webflow()?;
        let artists = ArtistRepository::new(&self.pool);
        let artist = artists
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("artist", id))?;

        if artist.status != RecordStatus::Active {
            return Err(AppError::Conflict(format!(
                "artist {id} is inactive and cannot be published"
            )));
        }

        let item_id = upsert_item(
            webflow,
            webflow.artists_collection_id(),
            artist.webflow_item_id.as_deref(),
            &artist_fields(&artist),
        )
        .await?;
        let artist = artists.set_webflow_item(id, Some(&item_id)).await?;
        info!(artist_id = %id, item_id, "Artist published");
        Ok(artist)
    }

    /// Remove an artist profile from the public site.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when Webflow is not configured.
    #[instrument(skip(self))]
    pub async fn unpublish_artist(&self, id: ArtistId) -> Result<Artist, AppError> {
        let webflow = self.require_webflow()?;
        let artists = ArtistRepository::new(&self.pool);
        let artist = artists
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("artist", id))?;

        if let Some(item_id) = &artist.webflow_item_id {
            webflow
                .delete_live_item(webflow.artists_collection_id(), item_id)
                .await?;
        }
        Ok(artists.set_webflow_item(id, None).await?)
    }

    fn require_webflow(&self) -> Result<&WebflowClient, AppError> {
        self.webflow
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Webflow publishing is not configured".into()))
    }
}

/// Update the item if we have one, creating it when it is missing.
async fn upsert_item(
    webflow: &WebflowClient,
    collection_id: &str,
    item_id: Option<&str>,
    fields: &Value,
) -> Result<String, WebflowError> {
    if let Some(item_id) = item_id {
        match webflow.update_live_item(collection_id, item_id, fields).await {
            Ok(item) => return Ok(item.id),
            Err(WebflowError::NotFound(_)) => {
                warn!(item_id, "Webflow item vanished; creating a new one");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(webflow.create_live_item(collection_id, fields).await?.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use maple_spruce_core::Email;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Intro to Rosemaling!"), "intro-to-rosemaling");
        assert_eq!(slugify("  Spoon -- Carving  "), "spoon-carving");
        assert_eq!(slugify("Kolrosing & Chip Carving 2"), "kolrosing-chip-carving-2");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_class_fields() {
        let starts_at = Utc.with_ymd_and_hms(2026, 12, 5, 14, 0, 0).unwrap();
        let class = Class {
            id: ClassId::new(17),
            title: "Straw Ornaments".to_string(),
            description: Some("Swedish julhalm".to_string()),
            category_id: None,
            instructor_id: None,
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(2),
            capacity: 12,
            price: Decimal::from_str("35.00").unwrap(),
            location: None,
            status: ClassStatus::Draft,
            webflow_item_id: None,
            created_at: starts_at,
            updated_at: starts_at,
        };
        let fields = class_fields(&ClassDetail::new(class, 5));

        assert_eq!(fields["name"], "Straw Ornaments");
        assert_eq!(fields["slug"], "straw-ornaments-17");
        assert_eq!(fields["price"], "35.00");
        assert_eq!(fields["location"], "");
        assert_eq!(fields["seats-remaining"], 7);
        assert_eq!(fields["starts-at"], "2026-12-05T14:00:00+00:00");
    }

    #[test]
    fn test_artist_fields_hide_contact_details() {
        let now = Utc::now();
        let artist = Artist {
            id: ArtistId::new(4),
            name: "Marit Haugen".to_string(),
            email: Email::parse("marit@example.org").unwrap(),
            phone: Some("555-0101".to_string()),
            bio: None,
            commission_rate: Decimal::from_str("0.3").unwrap(),
            status: RecordStatus::Active,
            webflow_item_id: None,
            created_at: now,
            updated_at: now,
        };
        let fields = artist_fields(&artist);
        assert_eq!(fields["slug"], "marit-haugen-4");
        assert!(fields.get("email").is_none());
        assert!(fields.get("phone").is_none());
    }
}
