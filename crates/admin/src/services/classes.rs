//! Class scheduling rules that span more than one table.

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::db::{CategoryRepository, ClassRepository, InstructorRepository, RepositoryError};
use crate::error::AppError;
use crate::models::{Class, ClassDetail, CreateClassInput, UpdateClassInput, ValidationError};
use crate::services::publishing::PublishingService;
use crate::webflow::WebflowClient;
use maple_spruce_core::{CategoryId, ClassId, ClassStatus, InstructorId};

pub struct ClassService {
    pool: PgPool,
    publishing: PublishingService,
}

impl ClassService {
    #[must_use]
    pub fn new(pool: PgPool, webflow: Option<WebflowClient>) -> Self {
        Self {
            publishing: PublishingService::new(pool.clone(), webflow),
            pool,
        }
    }

    fn classes(&self) -> ClassRepository<'_> {
        ClassRepository::new(&self.pool)
    }

    /// Create a draft class.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for bad input or unknown references.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_class(&self, input: CreateClassInput) -> Result<ClassDetail, AppError> {
        let input = input.validate()?;
        self.check_references(input.category_id, input.instructor_id)
            .await?;

        let class = self.classes().create(&input).await?;
        info!(class_id = %class.id, "Class created");
        Ok(ClassDetail::new(class, 0))
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the class does not exist.
    pub async fn get_class(&self, id: ClassId) -> Result<ClassDetail, AppError> {
        self.classes()
            .get_detail(id)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))
    }

    /// Merge a partial update.
    ///
    /// A status change to or from `published` goes through publishing so the
    /// public listing follows it; edits to a published class refresh the
    /// listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the schedule is inverted or capacity
    /// would drop below the seats already held (checked under the class lock).
    #[instrument(skip(self, input))]
    pub async fn update_class(
        &self,
        id: ClassId,
        input: UpdateClassInput,
    ) -> Result<ClassDetail, AppError> {
        let current = self.get_class(id).await?;
        let mut input = input.validate(&current.class)?;
        self.check_references(input.category_id.flatten(), input.instructor_id.flatten())
            .await?;

        let status = input.status.take();
        let touches_listing = input.touches_listing();
        if input.capacity.is_some() {
            self.update_capacity(id, &input).await?;
        } else {
            self.classes().update(id, &input).await?;
        }

        let was_published = current.class.status == ClassStatus::Published;
        match status {
            Some(ClassStatus::Published) if !was_published => {
                self.publishing.publish_class(id).await?;
            }
            Some(next) if was_published && next != ClassStatus::Published => {
                self.publishing.unpublish_class(id, next).await?;
            }
            Some(next) if next != current.class.status => {
                self.classes()
                    .set_publication(id, next, current.class.webflow_item_id.as_deref())
                    .await?;
            }
            _ => {
                if was_published && touches_listing {
                    self.publishing.refresh_class(id).await?;
                }
            }
        }

        self.get_class(id).await
    }

    /// Delete a class with no live registrations, taking down its listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` while non-cancelled registrations exist.
    #[instrument(skip(self))]
    pub async fn delete_class(&self, id: ClassId) -> Result<(), AppError> {
        let class: Class = self
            .classes()
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))?;

        let registrations = self.classes().active_registration_count(id).await?;
        if registrations > 0 {
            return Err(AppError::Conflict(format!(
                "class {id} has {registrations} active registration(s)"
            )));
        }

        self.publishing.remove_class_listing(&class).await?;
        self.classes().delete(id).await?;
        info!(class_id = %id, "Class deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`PublishingService::publish_class`].
    pub async fn publish_class(&self, id: ClassId) -> Result<ClassDetail, AppError> {
        self.publishing.publish_class(id).await?;
        self.get_class(id).await
    }

    /// # Errors
    ///
    /// See [`PublishingService::unpublish_class`].
    pub async fn unpublish_class(
        &self,
        id: ClassId,
        status: ClassStatus,
    ) -> Result<ClassDetail, AppError> {
        self.publishing.unpublish_class(id, status).await?;
        self.get_class(id).await
    }

    /// Apply an update that changes capacity while holding the class lock,
    /// so no registration can take a seat between the check and the write.
    async fn update_capacity(&self, id: ClassId, input: &UpdateClassInput) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let detail = ClassRepository::lock_detail(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))?;
        if let Some(capacity) = input.capacity {
            capacity_floor(capacity, detail.seats_taken)?;
        }
        ClassRepository::update_with(&mut *tx, id, input).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn check_references(
        &self,
        category_id: Option<CategoryId>,
        instructor_id: Option<InstructorId>,
    ) -> Result<(), AppError> {
        if let Some(category_id) = category_id
            && !CategoryRepository::new(&self.pool).exists(category_id).await?
        {
            return Err(ValidationError::new(
                "category_id",
                format!("category {category_id} does not exist"),
            )
            .into());
        }
        if let Some(instructor_id) = instructor_id
            && !InstructorRepository::new(&self.pool)
                .exists(instructor_id)
                .await?
        {
            return Err(ValidationError::new(
                "instructor_id",
                format!("instructor {instructor_id} does not exist"),
            )
            .into());
        }
        Ok(())
    }
}

/// Capacity may not drop below the seats already held.
///
/// # Errors
///
/// Returns a `ValidationError` on `capacity` when it would.
pub fn capacity_floor(capacity: i32, seats_taken: i64) -> Result<(), ValidationError> {
    if i64::from(capacity) < seats_taken {
        return Err(ValidationError::new(
            "capacity",
            format!("cannot be lower than the {seats_taken} seats already registered"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_floor() {
        assert!(capacity_floor(5, 5).is_ok());
        assert!(capacity_floor(6, 0).is_ok());
        assert_eq!(capacity_floor(2, 3).unwrap_err().field, "capacity");
    }
}
