//! Tasks Module
//!
//! # Module Structure
//!
//! ```text
//! tasks/
//! ├── mod.rs      - Module exports and documentation
//! ├── tracker.rs  - Version/clock bookkeeping over the store
//! ├── service.rs  - ACL-gated write path with hub announcements
//! └── handlers.rs - REST adapters
//! ```
//!
//! # Lifecycle
//!
//! A task is created at version 1 and stays active through any number of
//! updates. Delete is a soft delete and is terminal: the row keeps its
//! history, stops appearing in listings, and rejects further changes.

/// Version and vector-clock tracker
pub mod tracker;

/// Authorization-aware task operations
pub mod service;

/// HTTP handlers
pub mod handlers;

pub use service::TaskService;
pub use tracker::VersionClockTracker;
