//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! ADMIN_PASSWORD=... raze-cli admin create -e coach@razetraining.com -n "Coach" -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin database
//! - `ADMIN_PASSWORD` - Password for the new account (min 12 chars)

use raze_admin::services::{AdminAuthError, AdminAuthService};
use raze_core::{AdminRole, AdminUserId};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Password was not supplied.
    #[error("Set ADMIN_PASSWORD to the new account's password")]
    MissingPassword,

    /// Account could not be created.
    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `role` - Admin's role (`super_admin`, `admin`, or `viewer`)
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns an error if the role is unknown, the password is missing or too
/// short, or the email is already registered.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<AdminUserId, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let pool = connect("ADMIN_DATABASE_URL").await?;
    let password = std::env::var("ADMIN_PASSWORD")
        .ok()
        .filter(|p| !p.is_empty())
        .ok_or(AdminError::MissingPassword)?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let user = AdminAuthService::new(&pool)
        .create_admin(email, name, role, &password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}
