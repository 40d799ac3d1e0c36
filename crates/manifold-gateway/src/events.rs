//! The gateway event loop.
//!
//! A single task applies registry mutations and broadcast fan-out
//! sequentially, so the registry has one writer and broadcasts cannot
//! interleave. Targeted routing stays out of this loop — the stdout
//! router reads the registry directly — keeping the hot path off the
//! actor while all mutation still serializes through it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::{Client, ClientId, Registry};

/// Depth of the event-loop mailbox.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Events applied sequentially by the loop.
pub enum GatewayEvent {
    /// A client completed its WebSocket upgrade.
    Register(Arc<Client>),
    /// A client's connection tore down (read/write failure, close, or
    /// drop-slow-client). Idempotent.
    Unregister(ClientId),
    /// Fan one serialized message out to every registered client.
    Broadcast(String),
}

/// Apply one event to the registry.
pub async fn apply(registry: &Registry, event: GatewayEvent) {
    match event {
        GatewayEvent::Register(client) => {
            tracing::info!(client_id = %client.id, "websocket client connected");
            registry.insert(client).await;
        }
        GatewayEvent::Unregister(id) => {
            if registry.remove(&id).await {
                tracing::info!(client_id = %id, "websocket client disconnected");
            }
        }
        GatewayEvent::Broadcast(payload) => {
            let recipients = registry.broadcast(&payload).await;
            tracing::debug!(recipients, "broadcast message to clients");
        }
    }
}

/// Start the event loop. Runs until every sender is dropped.
pub fn start(registry: Arc<Registry>) -> (mpsc::Sender<GatewayEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            apply(&registry, event).await;
        }
    });
    (tx, handle)
}
