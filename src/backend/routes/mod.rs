//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports and documentation
//! ├── router.rs     - Main router creation and layers
//! └── api_routes.rs - Authenticated task, sync and ACL routes
//! ```

/// Main router creation
pub mod router;

/// Authenticated API routes
pub mod api_routes;

pub use router::create_router;
