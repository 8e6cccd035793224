//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password authentication and session tokens
//! - `webhooks` - Outbound notification webhooks with retry
//! - `payments` - Hosted checkout through the payment provider
//! - `shipping` - Carrier rates, labels and tracking
//! - `geo` - Cached IP geolocation
//! - `live_visitors` - In-process live visitor tracking
//! - `catalog` - Cached product catalog with stock
//! - `abandoned_carts` - Abandoned-cart reminder runs

pub mod abandoned_carts;
pub mod auth;
pub mod catalog;
pub mod geo;
pub mod live_visitors;
pub mod payments;
pub mod shipping;
pub mod webhooks;
