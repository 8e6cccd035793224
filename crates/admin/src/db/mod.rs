//! Database operations for admin `PostgreSQL`.
//!
//! # Database: `raze_admin` (SEPARATE from storefront)
//!
//! ## Tables (schema `admin`)
//!
//! - `admin_user` - Staff accounts with Argon2 password hashes
//! - `session` - Admin session storage
//! - `contact_note` - Notes on customer email addresses
//! - `activity_log` - Audit trail of admin actions
//! - `giveaway_winner` - Winners picked from giveaway entries
//!
//! Shop data is read through the storefront repositories against the
//! storefront pool.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p raze-cli -- migrate admin
//! ```

pub mod activity;
pub mod admin_users;
pub mod giveaway;
pub mod notes;

pub use activity::ActivityRepository;
pub use admin_users::AdminUserRepository;
pub use giveaway::GiveawayRepository;
pub use notes::NoteRepository;

pub use raze_storefront::db::{RepositoryError, create_pool};
