//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email and password sign-in for staff accounts
//!
//! Shop-side services (notification webhooks, abandoned-cart runs) come
//! from `raze_storefront::services`.

pub mod auth;

pub use auth::{AdminAuthError, AdminAuthService};
