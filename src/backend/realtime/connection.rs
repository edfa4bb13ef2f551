/**
 * Connection Records
 *
 * One record per live socket. The hub owns the sending half of the
 * outbound queue; the transport task owns the receiving half. Dropping the
 * record closes the queue, which is how the transport learns it has been
 * disconnected.
 */

use std::collections::HashSet;
use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier handed out by [`ConnectionHub::register`](super::ConnectionHub::register)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct Connection {
    pub user_id: String,
    pub outbound: mpsc::Sender<Bytes>,
    pub rooms: HashSet<String>,
}

impl Connection {
    pub fn new(user_id: impl Into<String>, outbound: mpsc::Sender<Bytes>) -> Self {
        Self {
            user_id: user_id.into(),
            outbound,
            rooms: HashSet::new(),
        }
    }
}
