//! Client identity, outbound queues, and the connection registry.
//!
//! The registry is the authoritative set of live connections. It is
//! written only by the event loop (see [`crate::events`]) and read by the
//! stdout router for targeted delivery, so the lock here is a plain
//! reader/writer lock with no further coordination.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Outbound queue depth per client. Enqueue is always non-blocking; a
/// full queue marks the client as dead.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Unique, opaque identifier for one WebSocket connection.
///
/// UUIDv4, so it can never contain the composite-id separator and never
/// collides with another connection's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A connected WebSocket client: identity plus its bounded outbound queue.
///
/// The queue has exactly one reader — the client's write pump, which holds
/// the receiver. The registry entry is the sole owner of the sender, so
/// unregistering closes the queue and lets the write pump exit.
pub struct Client {
    pub id: ClientId,
    tx: mpsc::Sender<String>,
}

impl Client {
    /// Create a client and the receiving end of its outbound queue.
    pub fn channel(id: ClientId) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        (Arc::new(Self { id, tx }), rx)
    }

    fn enqueue(&self, payload: String) -> Result<(), mpsc::error::TrySendError<String>> {
        self.tx.try_send(payload)
    }
}

/// Outcome of a targeted delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteResult {
    /// Message enqueued for the client's write pump.
    Delivered,
    /// Queue full or closed — the client must be unregistered.
    ClientDead,
    /// No such client (already disconnected); drop silently.
    Unknown,
}

/// Registry of all connected clients.
pub struct Registry {
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a client. Called only from the event loop.
    pub async fn insert(&self, client: Arc<Client>) {
        let mut clients = self.clients.write().await;
        if clients.insert(client.id.clone(), client).is_some() {
            tracing::warn!("client id collision on register");
        }
    }

    /// Remove a client. Called only from the event loop; idempotent.
    /// Dropping the entry closes the outbound queue.
    pub async fn remove(&self, id: &ClientId) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &ClientId) -> bool {
        self.clients.read().await.contains_key(id)
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Non-blocking targeted delivery to one client.
    pub async fn route(&self, client_id: &str, payload: String) -> RouteResult {
        let clients = self.clients.read().await;
        match clients.get(client_id) {
            Some(client) => match client.enqueue(payload) {
                Ok(()) => RouteResult::Delivered,
                Err(_) => RouteResult::ClientDead,
            },
            None => RouteResult::Unknown,
        }
    }

    /// Fan a message out to every client registered right now.
    ///
    /// Works on a snapshot, so clients may come and go mid-broadcast
    /// without corrupting the traversal. Clients whose queue is full are
    /// removed afterwards (drop-slow-client) and never block the caller.
    /// Returns the number of clients the message was enqueued for.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let snapshot: Vec<Arc<Client>> = {
            let clients = self.clients.read().await;
            clients.values().cloned().collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for client in &snapshot {
            match client.enqueue(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(client_id = %client.id, "outbound queue full, dropping client");
                    dead.push(client.id.clone());
                }
            }
        }

        if !dead.is_empty() {
            let mut clients = self.clients.write().await;
            for id in &dead {
                let _ = clients.remove(id);
            }
        }
        delivered
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
