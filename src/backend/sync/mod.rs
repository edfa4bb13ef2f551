//! Offline Sync Module
//!
//! A client that worked offline sends its queued changes together with
//! the highest version it has seen. The server replays the changes through
//! the normal task path and answers with the caller's tasks that moved
//! past that version.
//!
//! - **`reconciler`** - replay and pull
//! - **`handlers`** - `POST /api/tasks/sync`

/// Offline queue replay
pub mod reconciler;

/// HTTP handler
pub mod handlers;

pub use reconciler::SyncReconciler;
