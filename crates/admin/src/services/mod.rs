//! Business logic services for admin.
//!
//! # Services
//!
//! - `catalog` - Product writes mirrored to the Square catalog
//! - `classes` - Class scheduling and capacity rules
//! - `email` - Registration confirmations via SMTP
//! - `pricing` - Registration cost calculation
//! - `publishing` - Webflow CMS listings for classes and artists
//! - `registrations` - Seat allocation and the registration lifecycle
//! - `sync` - Square conflict detection and resolution

pub mod catalog;
pub mod classes;
pub mod email;
pub mod pricing;
pub mod publishing;
pub mod registrations;
pub mod sync;

pub use catalog::CatalogService;
pub use classes::ClassService;
pub use email::{EmailError, EmailService};
pub use pricing::{RegistrationQuote, calculate_registration_cost};
pub use publishing::PublishingService;
pub use registrations::RegistrationService;
pub use sync::{ProductCheck, SyncService, detect_conflicts};
