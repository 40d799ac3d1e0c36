//! Demultiplexer for the child's stdout.
//!
//! One line, one JSON-RPC document. Lines whose id carries the composite
//! form are routed to the originating client with the original id
//! restored; everything else (notifications, server-initiated requests)
//! is broadcast to every registered client. A malformed line is logged
//! and dropped; the router itself never fails.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::correlate;
use crate::events::GatewayEvent;
use crate::jsonrpc::RpcMessage;
use crate::registry::{Registry, RouteResult};

/// Read the child's stdout to EOF, dispatching each line.
pub async fn run_router<R>(stdout: R, registry: Arc<Registry>, events: mpsc::Sender<GatewayEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        dispatch_line(&line, &registry, &events).await;
    }
    tracing::debug!("server stdout closed");
}

/// Route one stdout line: targeted delivery, silent drop, or broadcast.
pub async fn dispatch_line(line: &str, registry: &Registry, events: &mpsc::Sender<GatewayEvent>) {
    let mut msg: RpcMessage = match serde_json::from_str(line) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("failed to parse server output: {e}: {line}");
            return;
        }
    };
    tracing::debug!("server → client: {line}");

    if let Some(id) = &msg.id {
        if let Some((client_id, original)) = correlate::split(id) {
            msg.id = Some(original);
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("failed to serialize routed response: {e}");
                    return;
                }
            };
            match registry.route(&client_id, payload).await {
                RouteResult::Delivered => {}
                RouteResult::ClientDead => {
                    // Drop-slow-client: the message is lost, the client
                    // is unregistered, the router keeps going.
                    tracing::warn!(client_id, "outbound queue full, unregistering client");
                    let _ = events.send(GatewayEvent::Unregister(client_id.into())).await;
                }
                RouteResult::Unknown => {
                    tracing::debug!(client_id, "response for disconnected client dropped");
                }
            }
            return;
        }
    }

    // No id, or an id the gateway did not rewrite — broadcast unchanged.
    let _ = events.send(GatewayEvent::Broadcast(line.to_string())).await;
}
