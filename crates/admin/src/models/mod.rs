//! Domain models for admin.
//!
//! Shop data (users, orders, inventory, ...) uses the storefront models;
//! only staff-side records live here.

pub mod activity;
pub mod admin_user;
pub mod giveaway;
pub mod note;
pub mod session;

pub use activity::{Action, ActivityEntry};
pub use admin_user::{AdminRole, AdminUser, NewAdminUser};
pub use giveaway::{GiveawayWinner, NewGiveawayWinner};
pub use note::ContactNote;
pub use session::{CurrentAdmin, keys as session_keys};
