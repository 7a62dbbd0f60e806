//! Email service for registration confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use maple_spruce_core::{Price, RegistrationStatus};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::EmailConfig;
use crate::models::{Class, Registration};

/// HTML template for the registration confirmation.
#[derive(Template)]
#[template(path = "email/registration_confirmation.html")]
struct ConfirmationEmailHtml<'a> {
    inner: &'a ConfirmationEmail<'a>,
}

/// Plain text template for the registration confirmation.
#[derive(Template)]
#[template(path = "email/registration_confirmation.txt")]
struct ConfirmationEmailText<'a> {
    inner: &'a ConfirmationEmail<'a>,
}

/// Values shown in a confirmation, pre-formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail<'a> {
    pub student_name: &'a str,
    pub class_title: &'a str,
    pub starts_at: String,
    pub location: Option<&'a str>,
    pub seats: i32,
    pub subtotal: String,
    pub discount_amount: String,
    pub has_discount: bool,
    pub total: String,
    pub registration_id: i32,
    pub waitlisted: bool,
}

impl<'a> ConfirmationEmail<'a> {
    #[must_use]
    pub fn new(registration: &'a Registration, class: &'a Class) -> Self {
        Self {
            student_name: &registration.student_name,
            class_title: &class.title,
            starts_at: class.starts_at.format("%A %B %-d, %Y at %H:%M UTC").to_string(),
            location: class.location.as_deref(),
            seats: registration.seats,
            subtotal: Price::usd(registration.subtotal).to_string(),
            discount_amount: Price::usd(registration.discount_amount).to_string(),
            has_discount: !registration.discount_amount.is_zero(),
            total: Price::usd(registration.total_cost).to_string(),
            registration_id: registration.id.as_i32(),
            waitlisted: registration.status == RegistrationStatus::Waitlisted,
        }
    }

    #[must_use]
    pub fn subject(&self) -> String {
        if self.waitlisted {
            format!("Waitlist: {}", self.class_title)
        } else {
            format!("You're registered: {}", self.class_title)
        }
    }

    fn render(&self) -> Result<(String, String), askama::Error> {
        let text = ConfirmationEmailText { inner: self }.render()?;
        let html = ConfirmationEmailHtml { inner: self }.render()?;
        Ok((text, html))
    }
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a registration (or waitlist) confirmation to the student.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip_all, fields(registration_id = %registration.id))]
    pub async fn send_registration_confirmation(
        &self,
        registration: &Registration,
        class: &Class,
    ) -> Result<(), EmailError> {
        let email = ConfirmationEmail::new(registration, class);
        let (text, html) = email.render()?;

        self.send_multipart_email(
            registration.student_email.as_str(),
            &email.subject(),
            &text,
            &html,
        )
        .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use maple_spruce_core::{
        ClassId, ClassStatus, DiscountId, Email, PaymentStatus, RegistrationId,
    };
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn class() -> Class {
        let starts_at = Utc.with_ymd_and_hms(2026, 11, 14, 18, 0, 0).unwrap();
        Class {
            id: ClassId::new(3),
            title: "Birch Bark Weaving".to_string(),
            description: None,
            category_id: None,
            instructor_id: None,
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(3),
            capacity: 8,
            price: Decimal::from_str("45.00").unwrap(),
            location: Some("Main Studio".to_string()),
            status: ClassStatus::Published,
            webflow_item_id: None,
            created_at: starts_at,
            updated_at: starts_at,
        }
    }

    fn registration(status: RegistrationStatus, discount: &str) -> Registration {
        let now = Utc::now();
        let subtotal = Decimal::from_str("90.00").unwrap();
        let discount_amount = Decimal::from_str(discount).unwrap();
        Registration {
            id: RegistrationId::new(41),
            class_id: ClassId::new(3),
            student_name: "Ada Lindqvist".to_string(),
            student_email: Email::parse("ada@example.org").unwrap(),
            student_phone: None,
            seats: 2,
            discount_id: (!discount_amount.is_zero()).then(|| DiscountId::new(1)),
            subtotal,
            discount_amount,
            total_cost: subtotal - discount_amount,
            status,
            payment_status: PaymentStatus::Unpaid,
            square_payment_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_confirmation_renders_costs() {
        let class = class();
        let registration = registration(RegistrationStatus::Pending, "9.00");
        let email = ConfirmationEmail::new(&registration, &class);
        let (text, html) = email.render().unwrap();

        assert!(text.contains("Hi Ada Lindqvist"));
        assert!(text.contains("reserved 2 seat(s)"));
        assert!(text.contains("Where: Main Studio"));
        assert!(text.contains("Discount: -$9.00"));
        assert!(text.contains("Total: $81.00"));
        assert!(html.contains("<strong>$81.00</strong>"));
        assert_eq!(email.subject(), "You're registered: Birch Bark Weaving");
    }

    #[test]
    fn test_waitlist_confirmation() {
        let class = class();
        let registration = registration(RegistrationStatus::Waitlisted, "0");
        let email = ConfirmationEmail::new(&registration, &class);
        let (text, _) = email.render().unwrap();

        assert!(text.contains("on the waitlist for 2 seat(s)"));
        assert!(!text.contains("Discount:"));
        assert_eq!(email.subject(), "Waitlist: Birch Bark Weaving");
    }

    #[test]
    fn test_start_time_format() {
        let class = class();
        let registration = registration(RegistrationStatus::Confirmed, "0");
        let email = ConfirmationEmail::new(&registration, &class);
        assert_eq!(email.starts_at, "Saturday November 14, 2026 at 18:00 UTC");
    }
}
