use super::MessageStore;
use crate::error::AppResult;
use crate::models::{DeliveryStatus, Message, NewMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// HashMap-backed store with the same conditional-update semantics as the
/// Postgres implementation. No durability; used by the test suite.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
    last_seen: Arc<RwLock<HashMap<Uuid, DateTime<Utc>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.read().await.get(&id).cloned()
    }

    pub async fn last_seen(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.last_seen.read().await.get(&user_id).copied()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create(&self, sender_id: Uuid, new: &NewMessage) -> AppResult<Message> {
        let msg = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id: new.receiver_id,
            kind: new.kind(),
            content: new.content.clone(),
            image_url: new.image_url.clone(),
            audio_url: new.audio_url.clone(),
            status: DeliveryStatus::Sent,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        };
        self.messages.write().await.insert(msg.id, msg.clone());
        Ok(msg)
    }

    async fn mark_delivered_if_sent(&self, id: Uuid) -> AppResult<bool> {
        let mut guard = self.messages.write().await;
        match guard.get_mut(&id) {
            Some(msg) if msg.status == DeliveryStatus::Sent => {
                msg.status = DeliveryStatus::Delivered;
                msg.delivered_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<bool> {
        let mut guard = self.messages.write().await;
        match guard.get_mut(&id) {
            Some(msg) if msg.status.can_advance_to(DeliveryStatus::Read) => {
                msg.status = DeliveryStatus::Read;
                msg.read_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_conversation_read(&self, sender_id: Uuid, receiver_id: Uuid) -> AppResult<u64> {
        let mut guard = self.messages.write().await;
        let mut changed = 0u64;
        for msg in guard.values_mut() {
            if msg.sender_id == sender_id
                && msg.receiver_id == receiver_id
                && msg.status != DeliveryStatus::Read
            {
                msg.status = DeliveryStatus::Read;
                msg.read_at = Some(Utc::now());
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn pending_for_receiver(&self, receiver_id: Uuid) -> AppResult<Vec<Message>> {
        let guard = self.messages.read().await;
        let mut pending: Vec<Message> = guard
            .values()
            .filter(|m| m.receiver_id == receiver_id && m.status == DeliveryStatus::Sent)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.created_at);
        Ok(pending)
    }

    async fn touch_last_seen(&self, user_id: Uuid) -> AppResult<()> {
        self.last_seen.write().await.insert(user_id, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_to(receiver_id: Uuid) -> NewMessage {
        NewMessage {
            receiver_id,
            content: Some("hi".into()),
            image_url: None,
            audio_url: None,
        }
    }

    #[tokio::test]
    async fn delivered_transition_requires_sent() {
        let store = InMemoryStore::new();
        let msg = store
            .create(Uuid::new_v4(), &text_to(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(store.mark_delivered_if_sent(msg.id).await.unwrap());
        // Second attempt loses the compare-and-set.
        assert!(!store.mark_delivered_if_sent(msg.id).await.unwrap());

        let stored = store.get(msg.id).await.unwrap();
        assert_eq!(stored.status, DeliveryStatus::Delivered);
        assert!(stored.delivered_at.is_some());
    }

    #[tokio::test]
    async fn read_is_terminal() {
        let store = InMemoryStore::new();
        let msg = store
            .create(Uuid::new_v4(), &text_to(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(store.mark_read(msg.id).await.unwrap());
        assert!(!store.mark_read(msg.id).await.unwrap());
        assert!(!store.mark_delivered_if_sent(msg.id).await.unwrap());
        assert_eq!(store.get(msg.id).await.unwrap().status, DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn conversation_read_only_touches_one_direction() {
        let store = InMemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let from_a = store.create(a, &text_to(b)).await.unwrap();
        let from_b = store.create(b, &text_to(a)).await.unwrap();

        let changed = store.mark_conversation_read(a, b).await.unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.get(from_a.id).await.unwrap().status, DeliveryStatus::Read);
        assert_eq!(store.get(from_b.id).await.unwrap().status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn pending_scan_skips_delivered_messages() {
        let store = InMemoryStore::new();
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        let first = store.create(sender, &text_to(receiver)).await.unwrap();
        let _second = store.create(sender, &text_to(receiver)).await.unwrap();
        store.mark_delivered_if_sent(first.id).await.unwrap();

        let pending = store.pending_for_receiver(receiver).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_ne!(pending[0].id, first.id);
    }
}
