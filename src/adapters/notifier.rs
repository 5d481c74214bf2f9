// src/adapters/notifier.rs - Fire-and-forget broadcast to real-time clients
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use super::{AdapterResult, ClientNotifier};

/// Wire shape of every message pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    pub data: Value,
}

/// Broadcasts client messages over a bounded `tokio` broadcast channel.
/// Slow subscribers lag and lose old messages instead of blocking the sender.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ClientMessage>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ClientNotifier for BroadcastNotifier {
    fn publish(&self, event: &str, data: Value) -> AdapterResult {
        let message = ClientMessage {
            event: event.to_string(),
            data,
        };
        match self.tx.send(message) {
            Ok(clients) => tracing::debug!(event, clients, "Published client message"),
            // Nobody listening is not a failure
            Err(_) => tracing::trace!(event, "No clients connected"),
        }
        Ok(())
    }
}
