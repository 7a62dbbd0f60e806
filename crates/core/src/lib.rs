//! Maple & Spruce Core - Shared domain types.
//!
//! This crate provides the types shared by every Maple & Spruce component:
//! - `admin` - The API service for inventory, classes and registrations
//! - `cli` - Command-line tools for migrations, seeding and sync checks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, statuses and discount rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
