/**
 * External Fan-out
 *
 * Hook for spreading hub messages across server instances. A hub
 * publishes every dispatched message wrapped in an envelope that names
 * the hub; subscribers re-broadcast envelopes from other hubs locally and
 * drop their own.
 *
 * `BroadcastFanout` is the in-process implementation, built on
 * `tokio::sync::broadcast`. A networked pub/sub plugs in behind the same
 * trait.
 */

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::shared::event::HubMessage;

/// Hub message tagged with the hub that published it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutEnvelope {
    pub origin: Uuid,
    pub message: HubMessage,
    /// Users reached in addition to `message.user_id`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_notify: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FanoutError {
    /// No subscriber is listening
    #[error("no fan-out subscribers")]
    NoSubscribers,

    /// Transport refused the message
    #[error("fan-out publish failed: {0}")]
    Publish(String),
}

/// Stream of envelopes published by any hub, this one included
pub type FanoutSubscription = BoxStream<'static, FanoutEnvelope>;

#[async_trait]
pub trait ExternalFanout: Send + Sync {
    async fn publish(&self, envelope: FanoutEnvelope) -> Result<(), FanoutError>;

    async fn subscribe(&self) -> Result<FanoutSubscription, FanoutError>;
}

/// In-process fan-out over a broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastFanout {
    sender: broadcast::Sender<FanoutEnvelope>,
}

impl BroadcastFanout {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

#[async_trait]
impl ExternalFanout for BroadcastFanout {
    async fn publish(&self, envelope: FanoutEnvelope) -> Result<(), FanoutError> {
        match self.sender.send(envelope) {
            Ok(receivers) => {
                tracing::debug!("[Fanout] Envelope published to {} subscribers", receivers);
                Ok(())
            }
            Err(_) => Err(FanoutError::NoSubscribers),
        }
    }

    async fn subscribe(&self) -> Result<FanoutSubscription, FanoutError> {
        let receiver = self.sender.subscribe();
        let stream = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => return Some((envelope, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Fanout] Subscriber lagged, skipped {} envelopes", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }
}
