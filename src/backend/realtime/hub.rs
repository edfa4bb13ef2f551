/**
 * Connection Hub
 *
 * Registry of live connections, grouped by user and by resource room.
 * All registry state sits behind one mutex; callers go through the narrow
 * command surface below and never see the maps.
 *
 * # Delivery
 *
 * `broadcast` targets the room named by `message.resource_id` plus every
 * connection of `message.user_id`. `broadcast_to` adds further users on
 * top, which the task service uses to reach an owner when someone else
 * made the change. A connection in more than one set gets the message
 * once per set; clients deduplicate. Sends never wait: a full or closed
 * queue drops the connection on the spot.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::connection::{Connection, ConnectionId};
use super::fanout::{ExternalFanout, FanoutEnvelope, FanoutError};
use crate::shared::event::HubMessage;

#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    users: HashMap<String, HashSet<ConnectionId>>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl Registry {
    /// Forget a connection everywhere. Dropping the record closes its queue.
    fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;

        if let Some(ids) = self.users.get_mut(&connection.user_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.users.remove(&connection.user_id);
            }
        }
        for room in &connection.rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }
        Some(connection)
    }
}

struct HubInner {
    id: Uuid,
    queue_capacity: usize,
    registry: Mutex<Registry>,
    fanout: Option<Arc<dyn ExternalFanout>>,
}

/// Shared handle to the hub; clones point at the same registry
#[derive(Clone)]
pub struct ConnectionHub {
    inner: Arc<HubInner>,
}

impl ConnectionHub {
    /// Hub without external fan-out
    pub fn new(queue_capacity: usize) -> Self {
        Self::build(queue_capacity, None)
    }

    /// Hub that also publishes every dispatched message to `fanout`
    pub fn with_fanout(queue_capacity: usize, fanout: Arc<dyn ExternalFanout>) -> Self {
        Self::build(queue_capacity, Some(fanout))
    }

    fn build(queue_capacity: usize, fanout: Option<Arc<dyn ExternalFanout>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                id: Uuid::new_v4(),
                queue_capacity: queue_capacity.max(1),
                registry: Mutex::new(Registry::default()),
                fanout,
            }),
        }
    }

    /// Instance id carried in fan-out envelopes
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Add a connection for `user_id` with a fresh bounded outbound queue
    pub async fn register(&self, user_id: &str) -> (ConnectionId, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        let id = ConnectionId::new();

        let mut registry = self.inner.registry.lock().await;
        registry.connections.insert(id, Connection::new(user_id, tx));
        registry.users.entry(user_id.to_string()).or_default().insert(id);
        tracing::info!("[Hub] Registered {} for {}", id, user_id);
        (id, rx)
    }

    /// Remove a connection from its user and every room, closing its queue.
    /// Returns false when the id was already gone.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.inner.registry.lock().await.remove(id);
        match removed {
            Some(connection) => {
                tracing::info!("[Hub] Unregistered {} for {}", id, connection.user_id);
                true
            }
            None => false,
        }
    }

    /// Subscribe a connection to a resource room, creating the room if needed
    pub async fn join_room(&self, id: ConnectionId, resource_id: &str) -> bool {
        let mut registry = self.inner.registry.lock().await;
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        connection.rooms.insert(resource_id.to_string());
        registry.rooms.entry(resource_id.to_string()).or_default().insert(id);
        tracing::debug!("[Hub] {} joined room {}", id, resource_id);
        true
    }

    /// Unsubscribe a connection from a room; empty rooms disappear
    pub async fn leave_room(&self, id: ConnectionId, resource_id: &str) -> bool {
        let mut registry = self.inner.registry.lock().await;
        let Some(connection) = registry.connections.get_mut(&id) else {
            return false;
        };
        let was_member = connection.rooms.remove(resource_id);
        if let Some(members) = registry.rooms.get_mut(resource_id) {
            members.remove(&id);
            if members.is_empty() {
                registry.rooms.remove(resource_id);
            }
        }
        tracing::debug!("[Hub] {} left room {}", id, resource_id);
        was_member
    }

    /// Deliver to room members and to every connection of `message.user_id`.
    /// Returns the number of queued copies, duplicates included.
    pub async fn broadcast(&self, message: &HubMessage) -> usize {
        self.broadcast_to(message, &[]).await
    }

    /// `broadcast`, plus every connection of each user in `also_notify`
    pub async fn broadcast_to(&self, message: &HubMessage, also_notify: &[String]) -> usize {
        let data = match serde_json::to_vec(message) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                tracing::error!("[Hub] Failed to serialize message: {:?}", e);
                return 0;
            }
        };

        let mut registry = self.inner.registry.lock().await;
        let mut targets: Vec<ConnectionId> = Vec::new();
        if let Some(room) = message.resource_id.as_ref().and_then(|id| registry.rooms.get(id)) {
            targets.extend(room.iter().copied());
        }
        for user_id in std::iter::once(&message.user_id).chain(also_notify) {
            if let Some(ids) = registry.users.get(user_id) {
                targets.extend(ids.iter().copied());
            }
        }

        let mut delivered = 0;
        let mut dropped: Vec<ConnectionId> = Vec::new();
        for id in targets {
            if dropped.contains(&id) {
                continue;
            }
            let Some(connection) = registry.connections.get(&id) else {
                continue;
            };
            match connection.outbound.try_send(data.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("[Hub] Outbound queue full for {}, disconnecting", id);
                    dropped.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!("[Hub] Outbound queue closed for {}", id);
                    dropped.push(id);
                }
            }
        }
        for id in dropped {
            registry.remove(id);
        }

        tracing::debug!(
            "[Hub] {:?} on {:?} delivered {} time(s)",
            message.event_type,
            message.resource_id,
            delivered
        );
        delivered
    }

    /// Direct send to one connection under the same drop policy
    pub async fn send_to(&self, id: ConnectionId, data: Bytes) -> bool {
        let mut registry = self.inner.registry.lock().await;
        let Some(connection) = registry.connections.get(&id) else {
            return false;
        };
        match connection.outbound.try_send(data) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("[Hub] Could not queue direct send to {}, disconnecting", id);
                registry.remove(id);
                false
            }
        }
    }

    /// Local broadcast, then external publish when a fan-out is attached.
    /// Publish failures are logged, never returned.
    pub async fn dispatch(&self, message: HubMessage) -> usize {
        self.dispatch_to(message, Vec::new()).await
    }

    /// `dispatch` with extra users, which travel with the message to
    /// other hubs
    pub async fn dispatch_to(&self, message: HubMessage, also_notify: Vec<String>) -> usize {
        let delivered = self.broadcast_to(&message, &also_notify).await;
        if self.inner.fanout.is_some() {
            let envelope = FanoutEnvelope {
                origin: self.inner.id,
                message,
                also_notify,
            };
            if let Err(e) = self.publish_envelope(envelope).await {
                tracing::warn!("[Hub] External publish failed: {}", e);
            }
        }
        delivered
    }

    /// Hand a message to the external fan-out, tagged with this hub's id
    pub async fn publish_external(&self, message: HubMessage) -> Result<(), FanoutError> {
        self.publish_envelope(FanoutEnvelope {
            origin: self.inner.id,
            message,
            also_notify: Vec::new(),
        })
        .await
    }

    async fn publish_envelope(&self, envelope: FanoutEnvelope) -> Result<(), FanoutError> {
        let Some(fanout) = &self.inner.fanout else {
            return Ok(());
        };
        fanout.publish(envelope).await
    }

    /// Fan-out this hub publishes to, if any
    pub fn fanout(&self) -> Option<Arc<dyn ExternalFanout>> {
        self.inner.fanout.clone()
    }

    /// Spawn the task that re-injects messages from other hubs into the
    /// local broadcast. `None` when no fan-out is attached.
    pub async fn subscribe_external(&self) -> Result<Option<JoinHandle<()>>, FanoutError> {
        let Some(fanout) = &self.inner.fanout else {
            return Ok(None);
        };
        let mut subscription = fanout.subscribe().await?;
        let hub = self.clone();

        let handle = tokio::spawn(async move {
            while let Some(envelope) = subscription.next().await {
                if envelope.origin == hub.inner.id {
                    continue;
                }
                hub.broadcast_to(&envelope.message, &envelope.also_notify).await;
            }
            tracing::info!("[Hub] External subscription ended");
        });
        Ok(Some(handle))
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.registry.lock().await.connections.len()
    }

    pub async fn room_count(&self) -> usize {
        self.inner.registry.lock().await.rooms.len()
    }

    /// Ids of the connections subscribed to `resource_id`
    pub async fn room_members(&self, resource_id: &str) -> Vec<ConnectionId> {
        self.inner
            .registry
            .lock()
            .await
            .rooms
            .get(resource_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}
