//! Server Module
//!
//! Initialization and shared state of the Axum server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports and documentation
//! ├── state.rs  - AppState and FromRef implementations
//! ├── config.rs - Store selection (Postgres or in-memory) and hub fan-out
//! └── init.rs   - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration**: `AppConfig` is read and validated by the binary
//! 2. **Store**: Postgres when `DATABASE_URL` is set, in-memory otherwise
//! 3. **State**: ACL engine, tracker, hub and reconciler share the store
//! 4. **Background Tasks**: fan-out subscription and periodic permission-cache purge
//! 5. **Router Creation**: routes, auth layer, tracing layer

/// Application state management
pub mod state;

/// Store and hub selection
pub mod config;

/// Server initialization
pub mod init;

pub use init::{build_state, create_app};
pub use state::AppState;
