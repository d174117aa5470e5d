use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::ReadCursor;

/// Queries over `read_cursors` (`spec.md` §3, §4.5).
#[derive(Clone)]
pub struct ReadCursorRepo {
    pool: PgPool,
}

impl ReadCursorRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Advance the cursor monotonically; `GREATEST` makes concurrent or
    /// out-of-order acks idempotent instead of regressing the cursor.
    pub async fn advance(
        &self,
        conversation_id: i64,
        user_id: i64,
        message_id: i64,
    ) -> Result<ReadCursor, ApiError> {
        let cursor = sqlx::query_as::<_, ReadCursor>(
            r#"
            INSERT INTO read_cursors (conversation_id, user_id, last_read_message_id, last_read_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (conversation_id, user_id) DO UPDATE
                SET last_read_message_id = GREATEST(read_cursors.last_read_message_id, EXCLUDED.last_read_message_id),
                    last_read_at = now()
            RETURNING conversation_id, user_id, last_read_message_id, last_read_at
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .bind(message_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(cursor)
    }

    pub async fn find(&self, conversation_id: i64, user_id: i64) -> Result<Option<ReadCursor>, ApiError> {
        let cursor = sqlx::query_as::<_, ReadCursor>(
            "SELECT conversation_id, user_id, last_read_message_id, last_read_at
             FROM read_cursors WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cursor)
    }

    /// Unread count for `user_id` in a conversation, given their cursor.
    pub async fn unread_count(&self, conversation_id: i64, user_id: i64) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1
              AND sender_id <> $2
              AND NOT deleted
              AND id > COALESCE(
                  (SELECT last_read_message_id FROM read_cursors
                   WHERE conversation_id = $1 AND user_id = $2),
                  0
              )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
