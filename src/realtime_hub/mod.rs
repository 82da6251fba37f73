//! RealtimeHub - WebSocket Connection Registry
//!
//! ## Responsibilities
//!
//! - Track live connections
//! - Unicast replies to one connection
//! - Relay payloads verbatim to every other connection (signaling)
//!
//! Each connection gets an unbounded channel; its socket task drains it.
//! Broadcast snapshots the membership before sending, so a disconnect during
//! fan-out neither blocks on the lock nor stops the remaining deliveries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Connection handle
pub type ConnectionId = Uuid;

/// Payload queued for a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
}

impl Outbound {
    /// Serialize a value as a text payload
    pub fn json<T: serde::Serialize>(value: &T) -> crate::Result<Self> {
        Ok(Self::Text(serde_json::to_string(value)?))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

/// Client connection
struct ClientConnection {
    tx: mpsc::UnboundedSender<Outbound>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    name: &'static str,
    connections: RwLock<HashMap<ConnectionId, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub; `name` labels log lines
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new connection
    pub async fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(hub = self.name, connection_id = %id, "Client connected");

        (id, rx)
    }

    /// Unregister a connection
    pub async fn unregister(&self, id: &ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(hub = self.name, connection_id = %id, "Client disconnected");
        }
    }

    /// Send to one connection; returns false if it is gone
    pub async fn send(&self, id: &ConnectionId, payload: Outbound) -> bool {
        let connections = self.connections.read().await;
        let Some(conn) = connections.get(id) else {
            tracing::debug!(hub = self.name, connection_id = %id, "Send to unknown connection dropped");
            return false;
        };

        if let Err(e) = conn.tx.send(payload) {
            tracing::warn!(hub = self.name, connection_id = %id, error = %e, "Failed to send message");
            return false;
        }
        true
    }

    /// Relay a payload to every connection except `sender`.
    ///
    /// Returns the number of connections that accepted it.
    pub async fn broadcast_except(&self, sender: &ConnectionId, payload: Outbound) -> usize {
        let targets: Vec<(ConnectionId, mpsc::UnboundedSender<Outbound>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .filter(|(id, _)| *id != sender)
                .map(|(id, conn)| (*id, conn.tx.clone()))
                .collect()
        };

        tracing::debug!(
            hub = self.name,
            sender = %sender,
            target_count = targets.len(),
            "Relaying message"
        );

        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(hub = self.name, connection_id = %id, error = %e, "Failed to relay message");
                }
            }
        }
        delivered
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Whether a connection is registered
    pub async fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new("default")
    }
}
