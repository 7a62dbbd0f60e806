//! Class registration: quoting, seat allocation and confirmation emails.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::registrations::NewRegistration;
use crate::db::{ClassRepository, DiscountRepository, RegistrationRepository, RepositoryError};
use crate::error::AppError;
use crate::models::{
    Class, CreateRegistrationInput, Discount, QuoteRequest, Registration, UpdateRegistrationInput,
    ValidationError,
};
use crate::services::email::EmailService;
use crate::services::pricing::{RegistrationQuote, calculate_registration_cost};
use maple_spruce_core::{RegistrationId, RegistrationStatus};

/// Status for a new registration given the seats left in the class.
///
/// # Errors
///
/// Returns `AppError::Conflict` when the class cannot fit the request and
/// the caller did not ask to be waitlisted.
pub fn admission(
    seats: i32,
    seats_remaining: i64,
    allow_waitlist: bool,
) -> Result<RegistrationStatus, AppError> {
    if i64::from(seats) <= seats_remaining {
        return Ok(RegistrationStatus::Pending);
    }
    if allow_waitlist {
        return Ok(RegistrationStatus::Waitlisted);
    }
    Err(AppError::Conflict(format!(
        "only {seats_remaining} seat(s) left, {seats} requested"
    )))
}

pub struct RegistrationService {
    pool: PgPool,
    email: Option<EmailService>,
}

impl RegistrationService {
    #[must_use]
    pub const fn new(pool: PgPool, email: Option<EmailService>) -> Self {
        Self { pool, email }
    }

    /// Price a registration without saving anything.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown class and
    /// `AppError::Validation` for an unknown or inapplicable discount code.
    #[instrument(skip(self, request), fields(class_id = %request.class_id))]
    pub async fn quote(
        &self,
        request: QuoteRequest,
        at: DateTime<Utc>,
    ) -> Result<RegistrationQuote, AppError> {
        let request = request.validate()?;
        let class = ClassRepository::new(&self.pool)
            .get(request.class_id)
            .await?
            .ok_or_else(|| AppError::not_found("class", request.class_id))?;
        let discount = self.discount_by_code(request.discount_code.as_deref()).await?;

        Ok(calculate_registration_cost(
            &class,
            request.seats,
            discount.as_ref(),
            at,
        )?)
    }

    /// Register a student for a published class.
    ///
    /// The class row is locked while seats are counted so concurrent
    /// registrations cannot oversell it. A confirmation email is sent when
    /// email is configured; a failed send is logged and does not undo the
    /// registration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the class is not open or is full (and
    /// waitlisting was not requested).
    #[instrument(skip(self, input), fields(class_id = %input.class_id, seats = input.seats))]
    pub async fn create_registration(
        &self,
        input: CreateRegistrationInput,
        at: DateTime<Utc>,
    ) -> Result<Registration, AppError> {
        let input = input.validate()?;
        let discount = self.discount_by_code(input.discount_code.as_deref()).await?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let detail = ClassRepository::lock_detail(&mut tx, input.class_id)
            .await?
            .ok_or_else(|| AppError::not_found("class", input.class_id))?;

        if !detail.class.status.accepts_registrations() {
            return Err(AppError::Conflict(format!(
                "class {} is {} and not open for registration",
                detail.class.id, detail.class.status
            )));
        }

        let quote = calculate_registration_cost(&detail.class, input.seats, discount.as_ref(), at)?;
        let status = admission(input.seats, detail.seats_remaining, input.allow_waitlist)?;

        let registration = RegistrationRepository::insert(
            &mut tx,
            &NewRegistration {
                class_id: input.class_id,
                student_name: input.student_name,
                student_email: input.student_email,
                student_phone: input.student_phone,
                seats: input.seats,
                discount_id: quote.discount_id,
                subtotal: quote.subtotal,
                discount_amount: quote.discount_amount,
                total_cost: quote.total,
                status,
                notes: input.notes,
            },
        )
        .await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            registration_id = %registration.id,
            status = %registration.status,
            total = %registration.total_cost,
            "Registration created"
        );

        self.send_confirmation(&registration, &detail.class).await;
        Ok(registration)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the registration does not exist.
    pub async fn get_registration(&self, id: RegistrationId) -> Result<Registration, AppError> {
        RegistrationRepository::new(&self.pool)
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("registration", id))
    }

    /// Merge a partial update. Moving a registration into a seat-holding
    /// status (e.g. off the waitlist) requires room in the class.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if there is no room for the move.
    #[instrument(skip(self, input))]
    pub async fn update_registration(
        &self,
        id: RegistrationId,
        input: UpdateRegistrationInput,
    ) -> Result<Registration, AppError> {
        let input = input.validate()?;
        let current = self.get_registration(id).await?;

        let takes_seats = input
            .status
            .is_some_and(|s| s.holds_seats() && !current.status.holds_seats());
        if !takes_seats {
            return Ok(RegistrationRepository::new(&self.pool)
                .update(id, &input)
                .await?);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let detail = ClassRepository::lock_detail(&mut tx, current.class_id)
            .await?
            .ok_or_else(|| AppError::not_found("class", current.class_id))?;
        admission(current.seats, detail.seats_remaining, false)?;

        let updated = RegistrationRepository::update_with(&mut *tx, id, &input).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(updated)
    }

    /// Cancel a registration, freeing its seats. Cancelling twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the registration does not exist.
    #[instrument(skip(self))]
    pub async fn cancel_registration(&self, id: RegistrationId) -> Result<Registration, AppError> {
        let current = self.get_registration(id).await?;
        if current.status == RegistrationStatus::Cancelled {
            return Ok(current);
        }

        let update = UpdateRegistrationInput {
            status: Some(RegistrationStatus::Cancelled),
            ..UpdateRegistrationInput::default()
        };
        let registration = RegistrationRepository::new(&self.pool)
            .update(id, &update)
            .await?;
        info!(registration_id = %id, "Registration cancelled");
        Ok(registration)
    }

    async fn discount_by_code(&self, code: Option<&str>) -> Result<Option<Discount>, AppError> {
        let Some(code) = code else {
            return Ok(None);
        };
        let discount = DiscountRepository::new(&self.pool)
            .get_by_code(code)
            .await?
            .ok_or_else(|| ValidationError::new("discount_code", format!("unknown code {code}")))?;
        Ok(Some(discount))
    }

    async fn send_confirmation(&self, registration: &Registration, class: &Class) {
        let Some(email) = &self.email else {
            tracing::debug!("Email not configured, skipping confirmation");
            return;
        };
        if let Err(e) = email
            .send_registration_confirmation(registration, class)
            .await
        {
            warn!(
                registration_id = %registration.id,
                error = %e,
                "Failed to send registration confirmation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_with_room() {
        assert!(matches!(
            admission(2, 2, false),
            Ok(RegistrationStatus::Pending)
        ));
    }

    #[test]
    fn test_admission_full_class() {
        assert!(matches!(admission(3, 2, false), Err(AppError::Conflict(_))));
        assert!(matches!(
            admission(3, 2, true),
            Ok(RegistrationStatus::Waitlisted)
        ));
        assert!(matches!(
            admission(1, 0, true),
            Ok(RegistrationStatus::Waitlisted)
        ));
    }
}
