//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (shared with the storefront)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers (shared with the storefront)
//!
//! Handlers opt into authentication with the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    AdminAuthRejection, RequireAdminAuth, RequireSuperAdmin, RequireWriteAccess,
    clear_current_admin, set_current_admin,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};

pub use raze_storefront::middleware::{request_id_middleware, security_headers_middleware};
