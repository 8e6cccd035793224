//! Domain models for storefront.
//!
//! Types here are what handlers and services work with; repositories in
//! [`crate::db`] read and write them.

pub mod abandoned_cart;
pub mod checkout;
pub mod inventory;
pub mod order;
pub mod product;
pub mod promo;
pub mod session;
pub mod subscription;
pub mod user;
pub mod visitor;
pub mod waitlist;
