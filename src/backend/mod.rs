//! Backend Module
//!
//! Server-side half of taskmesh, compiled with the `ssr` feature (on by
//! default).
//!
//! # Architecture
//!
//! An authenticated request flows through three stages:
//!
//! 1. **`acl`** - may this principal do this to this resource?
//! 2. **`tasks`** - bump version and clock, append the event, atomically
//! 3. **`realtime`** - fan the change out to the right live connections
//!
//! **`sync`** replays a reconnecting client's offline queue through the
//! same path and returns what changed while it was away.
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs      - Module exports and documentation
//! ├── acl/        - Permission evaluation, cache and grant management
//! ├── auth/       - Bearer token verification
//! ├── error/      - Backend error types and HTTP mapping
//! ├── middleware/ - Auth layer and principal extractor
//! ├── realtime/   - Connection hub, fan-out and WebSocket transport
//! ├── routes/     - Router assembly
//! ├── server/     - State, store selection, initialization
//! ├── store/      - Store trait with in-memory and Postgres backends
//! ├── sync/       - Offline reconciliation
//! └── tasks/      - Version/clock tracker and task service
//! ```
//!
//! # Thread Safety
//!
//! Services are `Clone` handles over `Arc`ed state. The hub registry sits
//! behind one mutex; the permission cache behind an `RwLock`; the store
//! serializes each call as one transaction.

/// Access control
#[cfg(feature = "ssr")]
pub mod acl;

/// Bearer token handling
#[cfg(feature = "ssr")]
pub mod auth;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Real-time update system
#[cfg(feature = "ssr")]
pub mod realtime;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Persistence
#[cfg(feature = "ssr")]
pub mod store;

/// Offline sync
#[cfg(feature = "ssr")]
pub mod sync;

/// Tasks
#[cfg(feature = "ssr")]
pub mod tasks;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use acl::AclEngine;
#[cfg(feature = "ssr")]
pub use error::{BackendError, BackendResult};
#[cfg(feature = "ssr")]
pub use realtime::ConnectionHub;
#[cfg(feature = "ssr")]
pub use server::{create_app, AppState};
#[cfg(feature = "ssr")]
pub use sync::SyncReconciler;
#[cfg(feature = "ssr")]
pub use tasks::{TaskService, VersionClockTracker};
