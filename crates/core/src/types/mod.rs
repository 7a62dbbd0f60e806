//! Core types for Maple & Spruce.
//!
//! This module provides type-safe wrappers for the collective's domain concepts.

pub mod discount;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use discount::{DiscountKind, DiscountRule, DiscountRuleError};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use status::*;
