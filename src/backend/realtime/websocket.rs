/**
 * WebSocket Transport
 *
 * `GET /api/tasks/ws` upgrades an authenticated request and binds the
 * socket to a hub connection:
 *
 * - queued hub messages are written to the socket as text frames
 * - `{"type":"join_room","resource_id":...}` and `leave_room` frames map
 *   to the hub's room commands
 * - a ping goes out every 54 seconds; a peer silent for 60 seconds is
 *   dropped
 * - on close, error, or hub-side disconnect the connection is unregistered
 */

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::connection::ConnectionId;
use super::hub::ConnectionHub;
use crate::backend::middleware::{AuthUser, AuthenticatedUser};
use crate::shared::event::ClientFrame;

/// Interval between server pings
pub const PING_INTERVAL: Duration = Duration::from_secs(54);

/// Silence after which the peer is considered gone
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Handle WebSocket upgrade (GET /api/tasks/ws)
pub async fn handle_task_socket(
    ws: WebSocketUpgrade,
    State(hub): State<ConnectionHub>,
    AuthUser(user): AuthUser,
) -> Response {
    tracing::info!("[Hub] WebSocket upgrade requested by {}", user.user_id);
    ws.on_upgrade(move |socket| serve_socket(socket, hub, user))
}

async fn serve_socket(socket: WebSocket, hub: ConnectionHub, user: AuthenticatedUser) {
    let (id, mut outbound) = hub.register(&user.user_id).await;
    let (mut sink, mut stream) = socket.split();

    let mut ping = interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                let Some(data) = queued else {
                    tracing::info!("[Hub] {} disconnected by hub", id);
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                if sink.send(text_frame(data)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                let Some(Ok(frame)) = incoming else {
                    break;
                };
                last_seen = Instant::now();
                match frame {
                    Message::Text(text) => handle_client_frame(&hub, id, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = ping.tick() => {
                if last_seen.elapsed() > PONG_WAIT {
                    tracing::info!("[Hub] {} timed out", id);
                    break;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister(id).await;
}

async fn handle_client_frame(hub: &ConnectionHub, id: ConnectionId, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::JoinRoom { resource_id }) => {
            hub.join_room(id, &resource_id).await;
        }
        Ok(ClientFrame::LeaveRoom { resource_id }) => {
            hub.leave_room(id, &resource_id).await;
        }
        Err(e) => {
            tracing::debug!("[Hub] Ignoring frame from {}: {}", id, e);
        }
    }
}

fn text_frame(data: Bytes) -> Message {
    match String::from_utf8(data.to_vec()) {
        Ok(text) => Message::Text(text.into()),
        Err(_) => Message::Binary(data),
    }
}
