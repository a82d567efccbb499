//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email and password authentication for staff

pub mod auth;

pub use auth::{AdminAuthError, AdminAuthService};
