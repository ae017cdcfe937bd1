//! Group broadcast bus: per-hub fan-out of [`HubEvent`]s.
//!
//! Every admitted session holds a [`Subscription`] to its hub's group;
//! dropping the handle is the unsubscribe. [`LocalBus`] covers a single
//! process with one `tokio::sync::broadcast` channel that receivers filter
//! by hub. [`RedisBus`] spans processes: publishes go through Redis pub/sub
//! and loop back into the local channel, so every instance — the publisher
//! included — observes the bus's per-group order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::broadcast;

use crate::error::ApiError;

use super::events::HubEvent;

/// Capacity of the in-process broadcast channel. Slow receivers that fall
/// behind skip messages (`RecvError::Lagged`).
const BROADCAST_CAPACITY: usize = 4096;

/// Redis channel for a hub's group.
fn group_channel(hub_id: i64) -> String {
    format!("hub:{hub_id}")
}

/// An event scoped to one hub's group.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub hub_id: i64,
    pub event: HubEvent,
}

#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// Publish an event to a hub's group. Delivery is at-least-once to
    /// currently subscribed sessions; there is no replay.
    async fn publish(&self, hub_id: i64, event: HubEvent) -> Result<(), ApiError>;

    /// Subscribe to a hub's group. The subscription is an owned resource;
    /// dropping it releases the group membership.
    fn subscribe(&self, hub_id: i64) -> Subscription;
}

/// Owned handle onto one hub's event stream.
pub struct Subscription {
    hub_id: i64,
    rx: broadcast::Receiver<Arc<BusMessage>>,
}

impl Subscription {
    /// Next event for this subscription's hub. Returns `None` once the bus
    /// is gone. A receiver that lagged behind skips the missed events and
    /// keeps going.
    pub async fn recv(&mut self) -> Option<Arc<BusMessage>> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if msg.hub_id == self.hub_id => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(hub_id = self.hub_id, skipped, "subscription lagged behind bus");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Single-process bus
// ---------------------------------------------------------------------------

/// In-process bus over a single broadcast channel.
#[derive(Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<Arc<BusMessage>>,
}

impl LocalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    fn dispatch(&self, msg: BusMessage) {
        // send() returns Err if there are no receivers — that's fine.
        let _ = self.sender.send(Arc::new(msg));
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BroadcastBus for LocalBus {
    async fn publish(&self, hub_id: i64, event: HubEvent) -> Result<(), ApiError> {
        self.dispatch(BusMessage { hub_id, event });
        Ok(())
    }

    fn subscribe(&self, hub_id: i64) -> Subscription {
        Subscription {
            hub_id,
            rx: self.sender.subscribe(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-process bus
// ---------------------------------------------------------------------------

/// Redis-backed bus. One background task PSUBSCRIBEs to `hub:*` and feeds
/// everything it hears into a [`LocalBus`] that sessions subscribe to.
pub struct RedisBus {
    conn: ConnectionManager,
    local: LocalBus,
}

impl RedisBus {
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        let local = LocalBus::new();

        tokio::spawn(subscriber_loop(client, local.clone()));

        Ok(Self { conn, local })
    }
}

async fn subscriber_loop(client: redis::Client, local: LocalBus) {
    loop {
        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                tracing::warn!(?e, "bus subscriber connect failed; retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if let Err(e) = pubsub.psubscribe("hub:*").await {
            tracing::warn!(?e, "bus psubscribe failed; retrying");
            tokio::time::sleep(Duration::from_secs(1)).await;
            continue;
        }

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let channel = msg.get_channel_name().to_string();
            let Some(hub_id) = channel
                .strip_prefix("hub:")
                .and_then(|s| s.parse::<i64>().ok())
            else {
                continue;
            };

            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(?e, %channel, "unreadable bus payload");
                    continue;
                }
            };

            match serde_json::from_str::<HubEvent>(&payload) {
                Ok(event) => local.dispatch(BusMessage { hub_id, event }),
                Err(e) => tracing::debug!(?e, %channel, "undecodable bus payload"),
            }
        }

        tracing::warn!("bus subscriber stream ended; reconnecting");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[async_trait]
impl BroadcastBus for RedisBus {
    async fn publish(&self, hub_id: i64, event: HubEvent) -> Result<(), ApiError> {
        let payload =
            serde_json::to_string(&event).map_err(|_| ApiError::internal("event serialization"))?;
        let mut conn = self.conn.clone();
        // The publish loops back through the subscriber task, so local
        // sessions see it in Redis's order along with everyone else.
        conn.publish::<_, _, ()>(group_channel(hub_id), payload)
            .await?;
        Ok(())
    }

    fn subscribe(&self, hub_id: i64) -> Subscription {
        self.local.subscribe(hub_id)
    }
}
