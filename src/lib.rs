//! taskmesh - Main Library
//!
//! Backend core for collaborative task tracking: users own tasks, share
//! them with other users, teams or the public at fine-grained permission
//! levels, and see changes live on every device, including after working
//! offline.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Permission sets, resource and grantee types, access control entries
//!   - Tasks, vector clocks, task events
//!   - Hub wire messages, sync requests and responses
//!   - Configuration and error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - ACL engine with a TTL permission cache
//!   - Version/clock tracker over a transactional store
//!   - Connection hub with rooms and WebSocket transport
//!   - Sync reconciler for offline queues
//!   - Axum routes, auth middleware, server bootstrap
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the `backend` module and its
//!   dependencies (Axum, sqlx, jsonwebtoken)
//!
//! # Usage
//!
//! ```rust,no_run
//! use taskmesh::backend::server::init::create_app;
//! use taskmesh::shared::config::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let app = create_app(config).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `shared::SharedError` for validation and parsing
//! - `backend::BackendError` for everything a request can fail with; it
//!   renders as a JSON body with the matching HTTP status

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
