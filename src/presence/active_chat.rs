use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Which peer each user currently has open in their UI.
///
/// Advisory state only: it decides the immediate-read fast path and nothing
/// else. Entries are written on join-chat, removed on leave-chat and on an
/// effective disconnect, so stale view state cannot outlive a session.
#[derive(Default, Clone)]
pub struct ActiveChatTracker {
    inner: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl ActiveChatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, user_id: Uuid, peer_id: Uuid) {
        self.inner.write().await.insert(user_id, peer_id);
    }

    pub async fn leave(&self, user_id: Uuid) {
        self.inner.write().await.remove(&user_id);
    }

    pub async fn is_open_with(&self, user_id: Uuid, peer_id: Uuid) -> bool {
        self.inner.read().await.get(&user_id) == Some(&peer_id)
    }
}
