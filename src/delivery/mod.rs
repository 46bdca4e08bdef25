use crate::error::AppResult;
use crate::metrics;
use crate::models::{DeliveryStatus, Message, NewMessage};
use crate::presence::{ActiveChatTracker, PresenceRegistry};
use crate::store::MessageStore;
use crate::websocket::message_types::ServerEvent;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Drives every message through sent -> delivered -> read.
///
/// Transitions are computed server-side from registry and tracker snapshots
/// taken while handling the event; clients never assert their own delivery
/// status.
#[derive(Clone)]
pub struct DeliveryService {
    pub registry: PresenceRegistry,
    pub tracker: ActiveChatTracker,
    pub store: Arc<dyn MessageStore>,
}

impl DeliveryService {
    pub fn new(
        registry: PresenceRegistry,
        tracker: ActiveChatTracker,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry,
            tracker,
            store,
        }
    }

    /// Persist and route a freshly sent message.
    pub async fn send_message(&self, sender_id: Uuid, new: NewMessage) -> AppResult<Message> {
        let msg = self.store.create(sender_id, &new).await?;
        metrics::MESSAGES_SENT.inc();
        tracing::debug!(
            message_id = %msg.id,
            sender_id = %msg.sender_id,
            receiver_id = %msg.receiver_id,
            kind = msg.kind.as_str(),
            "message persisted"
        );

        // The sender sees its own message without waiting on the receiver leg.
        self.push(
            sender_id,
            &ServerEvent::ReceiveMessage {
                message: msg.clone(),
            },
        )
        .await;

        if !self.registry.is_online(msg.receiver_id).await {
            // Receiver offline: stays `sent` until their next connect replays it.
            return Ok(msg);
        }

        if self.tracker.is_open_with(msg.receiver_id, sender_id).await {
            self.transition_read(msg).await
        } else {
            self.transition_delivered(msg).await
        }
    }

    /// Deliver everything that was sent while `user_id` was offline.
    ///
    /// Runs inside connect handling. The store-side compare-and-set keeps a
    /// rapid reconnect from delivering the same message twice.
    pub async fn replay_pending(&self, user_id: Uuid) -> AppResult<usize> {
        let pending = self.store.pending_for_receiver(user_id).await?;
        let mut delivered = 0usize;
        for msg in pending {
            match self.store.mark_delivered_if_sent(msg.id).await {
                Ok(true) => {
                    metrics::MESSAGES_DELIVERED.inc();
                    delivered += 1;
                    self.push(
                        msg.sender_id,
                        &ServerEvent::MessageStatus {
                            message_id: msg.id,
                            status: DeliveryStatus::Delivered,
                        },
                    )
                    .await;
                }
                Ok(false) => {}
                Err(e) => {
                    // Leave this message at its last persisted status; the
                    // next reconnect or read acknowledgement picks it up.
                    tracing::error!(message_id = %msg.id, error = %e, "replay transition failed");
                }
            }
        }
        if delivered > 0 {
            tracing::info!(%user_id, delivered, "replayed pending deliveries");
        }
        Ok(delivered)
    }

    /// Bulk read acknowledgement: `reader_id` has read everything sent to
    /// them by `from_user_id`. Notifies the original sender when online.
    pub async fn mark_conversation_read(
        &self,
        reader_id: Uuid,
        from_user_id: Uuid,
    ) -> AppResult<u64> {
        let changed = self
            .store
            .mark_conversation_read(from_user_id, reader_id)
            .await?;
        if changed > 0 {
            metrics::MESSAGES_READ.inc_by(changed);
        }
        self.push(from_user_id, &ServerEvent::MessagesRead { reader_id })
            .await;
        Ok(changed)
    }

    /// Receiver is looking at this conversation right now, so the message
    /// lands as `read` without passing through `delivered`.
    async fn transition_read(&self, mut msg: Message) -> AppResult<Message> {
        if !self.store.mark_read(msg.id).await? {
            return Ok(msg);
        }
        metrics::MESSAGES_READ.inc();
        msg.status = DeliveryStatus::Read;
        msg.read_at = Some(Utc::now());

        self.push(
            msg.receiver_id,
            &ServerEvent::ReceiveMessage {
                message: msg.clone(),
            },
        )
        .await;
        self.push(
            msg.sender_id,
            &ServerEvent::MessageStatus {
                message_id: msg.id,
                status: DeliveryStatus::Read,
            },
        )
        .await;
        Ok(msg)
    }

    async fn transition_delivered(&self, mut msg: Message) -> AppResult<Message> {
        if !self.store.mark_delivered_if_sent(msg.id).await? {
            // A concurrent replay already moved it and notified the sender.
            return Ok(msg);
        }
        metrics::MESSAGES_DELIVERED.inc();
        msg.status = DeliveryStatus::Delivered;
        msg.delivered_at = Some(Utc::now());

        self.push(
            msg.receiver_id,
            &ServerEvent::ReceiveMessage {
                message: msg.clone(),
            },
        )
        .await;
        self.push(
            msg.sender_id,
            &ServerEvent::MessageStatus {
                message_id: msg.id,
                status: DeliveryStatus::Delivered,
            },
        )
        .await;
        Ok(msg)
    }

    /// Serialize and push one event to one user. A miss is a no-op.
    pub(crate) async fn push(&self, user_id: Uuid, event: &ServerEvent) {
        match event.to_json() {
            Ok(payload) => {
                self.registry.send_to(user_id, payload).await;
            }
            Err(e) => tracing::error!(%user_id, error = %e, "failed to serialize event"),
        }
    }
}
