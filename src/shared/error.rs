//! Shared Error Types
//!
//! This module defines error types that are shared between the server and
//! its clients. They describe malformed domain values: bad permission
//! tokens, grantee shapes that break the ACL rules, unknown resource tags,
//! and payloads that fail to (de)serialize.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - Data validation failures
//! - `UnknownResourceType` - A resource tag with no ownership resolver
//!
//! # Usage
//!
//! ```rust
//! use taskmesh::shared::error::SharedError;
//!
//! let error = SharedError::validation("grantee_id", "PUBLIC grants cannot name a grantee");
//! ```
use thiserror::Error;

/// Shared error types that can occur in both client and server code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Resource tag that no ownership resolver understands
    #[error("Unsupported resource type: {0}")]
    UnknownResourceType(String),
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
