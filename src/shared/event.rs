/**
 * Real-time Event System
 *
 * Wire shapes for the connection hub: the messages the server fans out to
 * live connections, and the control frames clients send back over the
 * socket to join or leave a resource room.
 */
use serde::{Deserialize, Serialize};

use crate::shared::task::Task;

/// Type of real-time event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A task was created
    TaskCreated,
    /// A task's fields changed
    TaskUpdated,
    /// A task was soft-deleted
    TaskDeleted,
}

/// Message broadcast to room members and the acting user's connections
///
/// Field order is the wire order: `type`, `resource_id`, `payload`,
/// `user_id`, `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubMessage {
    /// Type of event
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Room the message targets, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Event payload (JSON-serializable data)
    pub payload: serde_json::Value,
    /// Account the event belongs to; all of its connections receive it
    pub user_id: String,
    /// RFC3339 timestamp when the event occurred
    pub timestamp: String,
}

impl HubMessage {
    /// Create a new hub message stamped with the current time
    pub fn new(
        event_type: EventType,
        resource_id: Option<String>,
        payload: serde_json::Value,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            resource_id,
            payload,
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Message describing a task after `actor_id` mutated it, addressed to
    /// the task's room and to every connection of the actor
    pub fn for_task(
        event_type: EventType,
        task: &Task,
        actor_id: &str,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            event_type,
            Some(task.id.clone()),
            serde_json::to_value(task)?,
            actor_id,
        ))
    }
}

/// Control frames a client sends over the socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Subscribe to a resource room
    JoinRoom { resource_id: String },
    /// Unsubscribe from a resource room
    LeaveRoom { resource_id: String },
}
