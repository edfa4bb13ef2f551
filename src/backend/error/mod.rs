//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! These errors are used by the ACL engine, the tracker and the HTTP
//! handlers, and can be converted to HTTP responses.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse and From<StoreError>
//! ```
//!
//! # Status Mapping
//!
//! | Variant            | Status |
//! |--------------------|--------|
//! | `PermissionDenied` | 403    |
//! | `NotFound`         | 404    |
//! | validation         | 400    |
//! | `Conflict`         | 409    |
//! | `StoreUnavailable` | 503    |

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;

/// Result alias used across the backend
pub type BackendResult<T> = Result<T, BackendError>;
