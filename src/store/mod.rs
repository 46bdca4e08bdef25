use crate::error::AppResult;
use crate::models::{Message, NewMessage};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgMessageStore;

/// Narrow persistence interface required by the delivery engine.
///
/// The durable store is an external collaborator. The engine needs create,
/// conditional status transitions, one bulk read transition, the pending
/// scan used on reconnect, and the last-seen stamp. Nothing else.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a new message with status `sent` and return the stored row.
    async fn create(&self, sender_id: Uuid, new: &NewMessage) -> AppResult<Message>;

    /// Advance a message to `delivered` only if it is still `sent`.
    /// Returns false when another transition won the race.
    async fn mark_delivered_if_sent(&self, id: Uuid) -> AppResult<bool>;

    /// Advance a message to `read` unless it is already there.
    async fn mark_read(&self, id: Uuid) -> AppResult<bool>;

    /// Transition every non-read message from `sender_id` to `receiver_id`
    /// into `read`. Returns the number of rows that changed.
    async fn mark_conversation_read(&self, sender_id: Uuid, receiver_id: Uuid) -> AppResult<u64>;

    /// All messages addressed to `receiver_id` still waiting in `sent`,
    /// oldest first.
    async fn pending_for_receiver(&self, receiver_id: Uuid) -> AppResult<Vec<Message>>;

    /// Stamp the user's last_seen to now. Called once per effective
    /// disconnect, never while the user is online.
    async fn touch_last_seen(&self, user_id: Uuid) -> AppResult<()>;
}
