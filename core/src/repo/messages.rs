use sqlx::PgPool;

use super::outbox::OutboxRepo;
use crate::error::ApiError;
use crate::models::{ContentType, Message};

/// Default and maximum page sizes for message history (`spec.md` §4.5).
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Queries over `messages` (`spec.md` §3, §4.5).
#[derive(Clone)]
pub struct MessageRepo {
    pool: PgPool,
}

impl MessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new message, bump the conversation's `updated_at`, and enqueue
    /// the `chat.message.sent` outbox event, all in one transaction (`spec.md`
    /// §4.7: a delivered notification and its triggering write commit
    /// atomically together). `dedup_key` should be stable across retries of
    /// the same logical send (e.g. derived from a client-supplied idempotency
    /// key).
    pub async fn insert_and_enqueue(
        &self,
        outbox: &OutboxRepo,
        conversation_id: i64,
        sender_id: i64,
        recipient_id: i64,
        content: &str,
        content_type: ContentType,
        dedup_key: &str,
    ) -> Result<Message, ApiError> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content, content_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, sender_id, content, content_type, created_at, read_at, deleted
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(content_type.to_string())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        let payload = serde_json::json!({
            "conversation_id": conversation_id,
            "message_id": message.id,
            "sender_id": sender_id,
            "recipient_id": recipient_id,
        });
        outbox
            .enqueue(&mut tx, "chat.message.sent", payload, dedup_key)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Cursor-paginated history, newest first (`spec.md` §4.5). `before_id`
    /// excludes messages at or after that id; pass `None` for the first page.
    pub async fn list_page(
        &self,
        conversation_id: i64,
        before_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, ApiError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        let messages = match before_id {
            Some(before) => {
                sqlx::query_as::<_, Message>(
                    "SELECT id, conversation_id, sender_id, content, content_type, created_at, read_at, deleted
                     FROM messages
                     WHERE conversation_id = $1 AND id < $2 AND NOT deleted
                     ORDER BY id DESC
                     LIMIT $3",
                )
                .bind(conversation_id)
                .bind(before)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(
                    "SELECT id, conversation_id, sender_id, content, content_type, created_at, read_at, deleted
                     FROM messages
                     WHERE conversation_id = $1 AND NOT deleted
                     ORDER BY id DESC
                     LIMIT $2",
                )
                .bind(conversation_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(messages)
    }

    pub async fn find_by_id(&self, message_id: i64) -> Result<Option<Message>, ApiError> {
        let message = sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, sender_id, content, content_type, created_at, read_at, deleted
             FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_clamps_into_bounds() {
        assert_eq!(1_i64.clamp(1, MAX_PAGE_SIZE), 1);
        assert_eq!((MAX_PAGE_SIZE + 1000).clamp(1, MAX_PAGE_SIZE), MAX_PAGE_SIZE);
    }
}
