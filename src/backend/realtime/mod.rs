//! Real-time Update Module
//!
//! Fans task changes out to the live connections that should see them.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs        - Module exports and documentation
//! ├── connection.rs - Per-socket record and id
//! ├── hub.rs        - Registry of users, rooms and outbound queues
//! ├── fanout.rs     - Cross-instance publish/subscribe hook
//! └── websocket.rs  - WebSocket transport bound to the hub
//! ```
//!
//! # Rooms
//!
//! A room is the set of connections watching one resource id. Rooms exist
//! only while they have members. A message reaches its room plus every
//! connection of the acting user, so one socket may see it twice.
//!
//! # Backpressure
//!
//! Each connection has a bounded outbound queue. The hub never waits on a
//! slow client: when a queue is full the connection is dropped and the
//! client is expected to reconnect and resync.

/// Per-connection record
pub mod connection;

/// External fan-out hook
pub mod fanout;

/// Connection registry and delivery
pub mod hub;

/// WebSocket upgrade handler
pub mod websocket;

pub use connection::ConnectionId;
pub use fanout::{BroadcastFanout, ExternalFanout, FanoutEnvelope, FanoutError};
pub use hub::ConnectionHub;
pub use websocket::handle_task_socket;
