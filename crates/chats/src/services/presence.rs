//! Best-effort push fan-out keyed by identity.
//!
//! Nothing here is durable. The registry maps an identity to its live connections and is
//! rebuilt as connections come and go; a push to an identity with no connections is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

use crate::types::{ChatResult, PresenceEvent};
use crate::utils::Validator;

pub type ConnectionId = u64;

type ConnectionMap = HashMap<String, HashMap<ConnectionId, mpsc::Sender<PresenceEvent>>>;

/// Handle returned by [`PresenceChannel::subscribe`]; events for the identity arrive on
/// `receiver` until the connection unsubscribes or is dropped.
#[derive(Debug)]
pub struct PresenceSubscription {
    pub identity: String,
    pub connection_id: ConnectionId,
    pub receiver: mpsc::Receiver<PresenceEvent>,
}

#[derive(Clone)]
pub struct PresenceChannel {
    connections: Arc<RwLock<ConnectionMap>>,
    next_connection: Arc<AtomicU64>,
    capacity: usize,
}

impl PresenceChannel {
    /// `capacity` bounds the per-connection buffer; pushes beyond it are dropped.
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_connection: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Register a new connection for `identity`. Several connections per identity are fine.
    pub async fn subscribe(&self, identity: &str) -> ChatResult<PresenceSubscription> {
        Validator::identity("identity", identity)?;

        let (sender, receiver) = mpsc::channel(self.capacity);
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);

        let mut connections = self.connections.write().await;
        connections
            .entry(identity.to_string())
            .or_default()
            .insert(connection_id, sender);

        debug!(identity, connection_id, "presence subscribed");
        Ok(PresenceSubscription {
            identity: identity.to_string(),
            connection_id,
            receiver,
        })
    }

    /// Hand `event` to every live connection of `identity` without waiting on any of them.
    ///
    /// Returns how many connections accepted it. Full buffers drop the event; closed
    /// connections are pruned.
    pub async fn push(&self, identity: &str, event: PresenceEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let connections = self.connections.read().await;
            let Some(targets) = connections.get(identity) else {
                trace!(identity, "push dropped, no connections");
                return 0;
            };

            for (connection_id, sender) in targets {
                match sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(identity, connection_id, "push dropped, connection buffer full");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*connection_id),
                }
            }
        }

        if !closed.is_empty() {
            let mut connections = self.connections.write().await;
            if let Some(targets) = connections.get_mut(identity) {
                targets.retain(|id, sender| !(closed.contains(id) && sender.is_closed()));
                if targets.is_empty() {
                    connections.remove(identity);
                }
            }
        }

        trace!(identity, delivered, event = event.event_type_name(), "push fanned out");
        delivered
    }

    /// Forget one connection. Returns `false` if it was not registered.
    pub async fn unsubscribe(&self, identity: &str, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let Some(targets) = connections.get_mut(identity) else {
            return false;
        };

        let removed = targets.remove(&connection_id).is_some();
        if targets.is_empty() {
            connections.remove(identity);
        }

        if removed {
            debug!(identity, connection_id, "presence unsubscribed");
        }
        removed
    }

    /// Forget every connection of `identity`, returning how many there were.
    pub async fn unsubscribe_all(&self, identity: &str) -> usize {
        let removed = self
            .connections
            .write()
            .await
            .remove(identity)
            .map(|targets| targets.len())
            .unwrap_or(0);

        debug!(identity, removed, "presence cleared");
        removed
    }

    pub async fn connection_count(&self, identity: &str) -> usize {
        self.connections
            .read()
            .await
            .get(identity)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

impl Default for PresenceChannel {
    fn default() -> Self {
        Self::new(64)
    }
}
