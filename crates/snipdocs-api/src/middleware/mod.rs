//! API Middleware
//!
//! Session authentication for protected endpoints.

pub mod auth;

pub use auth::{require_auth, AuthUser, SESSION_COOKIE};
