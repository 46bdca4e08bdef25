use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

pub mod active_chat;

pub use active_chat::ActiveChatTracker;

/// Unique identifier for one WebSocket connection.
///
/// A reconnecting user gets a fresh id, which lets a late disconnect for the
/// old connection be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound half of a live connection.
struct ConnectionHandle {
    id: ConnectionId,
    sender: UnboundedSender<String>,
    connected_at: DateTime<Utc>,
}

/// Who is reachable for push delivery right now.
///
/// Holds at most one handle per user: a later connect for the same user
/// supersedes the earlier one. Mutated only by connect and disconnect;
/// every routing decision reads it.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, ConnectionHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the connection for `user_id`, superseding any earlier handle.
    pub async fn register(&self, user_id: Uuid, id: ConnectionId, sender: UnboundedSender<String>) {
        let handle = ConnectionHandle {
            id,
            sender,
            connected_at: Utc::now(),
        };
        let mut guard = self.inner.write().await;
        if guard.insert(user_id, handle).is_some() {
            tracing::debug!(%user_id, "superseded previous connection");
        }
    }

    /// Remove the entry for `user_id` only when `id` still matches the
    /// stored handle. A mismatch means a newer connect already superseded
    /// this connection and the disconnect is stale.
    pub async fn unregister(&self, user_id: Uuid, id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get(&user_id).map(|handle| handle.id == id) {
            Some(true) => {
                if let Some(handle) = guard.remove(&user_id) {
                    tracing::debug!(
                        %user_id,
                        session_secs = (Utc::now() - handle.connected_at).num_seconds(),
                        "connection closed"
                    );
                }
                true
            }
            Some(false) => {
                tracing::debug!(%user_id, "ignoring stale disconnect");
                false
            }
            None => false,
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }

    /// Push a payload to the user's connection. An absent or closed target
    /// is skipped; the caller treats a miss as "deliver nothing now".
    pub async fn send_to(&self, user_id: Uuid, payload: String) -> bool {
        let guard = self.inner.read().await;
        match guard.get(&user_id) {
            Some(handle) => handle.sender.send(payload).is_ok(),
            None => false,
        }
    }

    /// Snapshot of every user currently reachable for push delivery.
    pub async fn online_users(&self) -> Vec<Uuid> {
        self.inner.read().await.keys().copied().collect()
    }

    /// Send a payload to every live connection. Closed channels are skipped;
    /// their sessions get torn down by their own disconnect path.
    pub async fn broadcast(&self, payload: &str) {
        let guard = self.inner.read().await;
        for handle in guard.values() {
            let _ = handle.sender.send(payload.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn later_connect_supersedes_earlier_handle() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        registry.register(user, first, tx1).await;
        registry.register(user, second, tx2).await;

        assert!(registry.send_to(user, "ping".into()).await);
        assert_eq!(rx2.try_recv().unwrap(), "ping");
        assert!(rx1.try_recv().is_err());
        assert_eq!(registry.online_users().await, vec![user]);
    }

    #[tokio::test]
    async fn stale_disconnect_leaves_newer_entry_untouched() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();

        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        registry.register(user, first, tx1).await;
        registry.register(user, second, tx2).await;

        assert!(!registry.unregister(user, first).await);
        assert!(registry.is_online(user).await);

        assert!(registry.unregister(user, second).await);
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn send_to_absent_user_is_a_miss() {
        let registry = PresenceRegistry::new();
        assert!(!registry.send_to(Uuid::new_v4(), "ping".into()).await);
    }

    #[tokio::test]
    async fn broadcast_skips_closed_channels() {
        let registry = PresenceRegistry::new();
        let alive = Uuid::new_v4();
        let gone = Uuid::new_v4();

        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, rx2) = unbounded_channel();
        drop(rx2);

        registry.register(alive, ConnectionId::new(), tx1).await;
        registry.register(gone, ConnectionId::new(), tx2).await;

        registry.broadcast("hello").await;
        assert_eq!(rx1.try_recv().unwrap(), "hello");
    }
}
