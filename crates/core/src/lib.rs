//! Shopfront Core - Domain types and pricing rules.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `api` - The JSON HTTP server
//! - `cli` - Command-line tools for migrations, users and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything that involves money arithmetic lives here
//! so it can be tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money helpers and status enums
//! - [`pricing`] - Coupon, offer and order total calculations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use types::*;
