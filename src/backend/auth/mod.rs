//! Authentication Module
//!
//! Credential issuance, refresh and logout live in the identity service.
//! This module only knows how to read the bearer tokens it hands out.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs       - Module exports and documentation
//! └── sessions.rs  - JWT claims, verification and test issuance
//! ```

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{create_token, verify_token, Claims};
