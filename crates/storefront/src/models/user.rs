//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::{AuthProvider, Email, UserId};

/// A storefront customer account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub picture: Option<String>,
    pub auth_provider: AuthProvider,
    pub gymnastics_type: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i32>,
    /// Personal 10% code issued at signup.
    pub first_order_discount_code: Option<String>,
    pub has_used_first_order_discount: bool,
    pub order_count: i32,
    /// Current credit balance.
    pub raze_credits: i32,
    pub total_credits_earned: i32,
    pub total_credits_redeemed: i32,
    /// Marketing notifications are suppressed when false.
    pub email_subscribed: bool,
    /// Google signups must pick a discipline before the account is complete.
    pub needs_profile_completion: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub auth_provider: AuthProvider,
    pub gymnastics_type: Option<&'a str>,
    pub gender: Option<&'a str>,
    pub age: Option<i32>,
    pub first_order_discount_code: &'a str,
    pub signup_credits: i32,
}

/// Account as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub auth_provider: AuthProvider,
    pub gymnastics_type: Option<String>,
    pub first_order_discount_code: Option<String>,
    pub has_used_first_order_discount: bool,
    pub order_count: i32,
    pub raze_credits: i32,
    pub total_credits_earned: i32,
    pub total_credits_redeemed: i32,
    pub is_admin: bool,
    pub needs_profile_completion: bool,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    #[must_use]
    pub fn new(user: &User, is_admin: bool) -> Self {
        Self {
            user_id: user.id,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            picture: user.picture.clone(),
            auth_provider: user.auth_provider,
            gymnastics_type: user.gymnastics_type.clone(),
            first_order_discount_code: user.first_order_discount_code.clone(),
            has_used_first_order_discount: user.has_used_first_order_discount,
            order_count: user.order_count,
            raze_credits: user.raze_credits,
            total_credits_earned: user.total_credits_earned,
            total_credits_redeemed: user.total_credits_redeemed,
            is_admin,
            needs_profile_completion: user.needs_profile_completion,
            created_at: user.created_at,
        }
    }
}
