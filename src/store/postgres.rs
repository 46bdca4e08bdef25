use super::MessageStore;
use crate::error::AppResult;
use crate::models::{Message, NewMessage};
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, kind, content, image_url, audio_url, \
     status, created_at, delivered_at, read_at";

/// sqlx-backed store. Status transitions are conditional UPDATEs so that
/// concurrent writers can never move a message backward.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: Pool<Postgres>,
}

impl PgMessageStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, sender_id: Uuid, new: &NewMessage) -> AppResult<Message> {
        let sql = format!(
            "INSERT INTO messages (id, sender_id, receiver_id, kind, content, image_url, audio_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'sent') \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let msg = sqlx::query_as::<_, Message>(&sql)
            .bind(Uuid::new_v4())
            .bind(sender_id)
            .bind(new.receiver_id)
            .bind(new.kind())
            .bind(&new.content)
            .bind(&new.image_url)
            .bind(&new.audio_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(msg)
    }

    async fn mark_delivered_if_sent(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'delivered', delivered_at = NOW() \
             WHERE id = $1 AND status = 'sent'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'read', read_at = NOW() \
             WHERE id = $1 AND status <> 'read'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_conversation_read(&self, sender_id: Uuid, receiver_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'read', read_at = NOW() \
             WHERE sender_id = $1 AND receiver_id = $2 AND status <> 'read'",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn pending_for_receiver(&self, receiver_id: Uuid) -> AppResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE receiver_id = $1 AND status = 'sent' \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, Message>(&sql)
            .bind(receiver_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn touch_last_seen(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_seen = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
