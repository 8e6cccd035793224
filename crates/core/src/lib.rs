//! RAZE Core - Shared domain types and storefront computations.
//!
//! This crate provides the types and pure logic used across all RAZE components:
//! - `storefront` - Public JSON API consumed by the shop front-end
//! - `admin` - Back-office API for users, orders and analytics
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Anything that needs a clock takes `now` as an argument.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`cart`] - Line totals, subtotals and checkout quotes
//! - [`catalog`] - Launch products
//! - [`promo`] - Promo code rules and discount calculation
//! - [`credits`] - Loyalty credit tiers and first-order codes
//! - [`waitlist`] - Size selections, access codes and public counters
//! - [`inventory`] - Stock availability
//! - [`order`] - Order numbers and tracking timelines
//! - [`analytics`] - User-agent parsing and visitor rollups
//! - [`abandoned_cart`] - Reminder email scheduling

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod abandoned_cart;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod credits;
pub mod inventory;
pub mod order;
pub mod promo;
pub mod types;
pub mod waitlist;

pub use types::*;

/// Uppercase hex characters taken from a fresh UUID v4.
///
/// Used for human-facing codes (order numbers, access codes).
#[must_use]
pub fn random_hex_upper(len: usize) -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(len)
        .collect::<String>()
        .to_uppercase()
}
