//! Access Control Module
//!
//! Who may see or change a shared resource.
//!
//! # Module Structure
//!
//! ```text
//! acl/
//! ├── mod.rs              - Module exports and documentation
//! ├── cache.rs            - TTL cache of effective permissions
//! ├── permission_store.rs - Entry persistence plus cache-aside lookups
//! ├── engine.rs           - Grant, share, revoke, list and checks
//! └── handlers.rs         - REST adapters
//! ```
//!
//! # Evaluation
//!
//! Owners hold `FULL_ACCESS`. Anyone else holds the union of the active
//! entries naming them, any of their teams, or the public. Expired entries
//! stay in storage but are ignored by every query.
//!
//! # Staleness
//!
//! Computed permissions are cached per user and resource for a fixed TTL.
//! Grants and revokes do not evict cached values, so a change reaches a
//! user who was checked recently only after their entry expires.

/// Effective-permission cache
pub mod cache;

/// Persistence wrapper with cache-aside lookups
pub mod permission_store;

/// Authorization decisions and grant management
pub mod engine;

/// HTTP handlers
pub mod handlers;

pub use cache::PermissionCache;
pub use engine::AclEngine;
pub use permission_store::PermissionStore;
