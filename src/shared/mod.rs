//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and its clients: the permission model, access control
//! entries, tasks with their version/clock bookkeeping, hub wire messages
//! and the offline sync protocol.
//!
//! # Overview
//!
//! Everything here is platform-agnostic and serializable, so a client can
//! depend on the crate with default features disabled and still speak the
//! same wire format as the server.

/// Permission bitmask, resource and grantee tags
pub mod permission;

/// Access control entries and share requests
pub mod acl;

/// Task model, vector clock and event log rows
pub mod task;

/// Real-time event system
pub mod event;

/// Offline sync protocol
pub mod sync;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use acl::{AccessControlEntry, Resource, SharedResource};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{ClientFrame, EventType, HubMessage};
pub use permission::{Grantee, GranteeType, PermissionSet, ResourceType};
pub use sync::{SyncChange, SyncChangeType, SyncRequest, SyncResponse};
pub use task::{Task, TaskChange, TaskEvent, TaskEventType, TaskMutation, VectorClock};
