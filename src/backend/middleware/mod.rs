//! Middleware Module
//!
//! HTTP middleware applied in front of the handlers.
//!
//! - **`auth`** - bearer-token verification and the `AuthUser` extractor

pub mod auth;

pub use auth::{auth_middleware, extract_authenticated_user, AuthUser, AuthenticatedUser};
