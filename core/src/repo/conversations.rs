use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Conversation;

/// Queries over `conversations` (`spec.md` §3, §4.5).
#[derive(Clone)]
pub struct ConversationRepo {
    pool: PgPool,
}

impl ConversationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the conversation for a canonically-ordered pair, creating it
    /// if this is the first message exchanged (`spec.md` §4.5: a
    /// conversation is created lazily, on first send, not on match).
    pub async fn find_or_create(&self, user1_id: i64, user2_id: i64) -> Result<Conversation, ApiError> {
        let inserted = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (user1_id, user2_id)
            VALUES ($1, $2)
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            RETURNING id, user1_id, user2_id, created_at, updated_at, blocked_by
            "#,
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(c) = inserted {
            return Ok(c);
        }

        let existing = sqlx::query_as::<_, Conversation>(
            "SELECT id, user1_id, user2_id, created_at, updated_at, blocked_by
             FROM conversations WHERE user1_id = $1 AND user2_id = $2",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    pub async fn find_by_id(&self, conversation_id: i64) -> Result<Option<Conversation>, ApiError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, user1_id, user2_id, created_at, updated_at, blocked_by
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    /// All conversations a user participates in, most recently updated first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Conversation>, ApiError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, user1_id, user2_id, created_at, updated_at, blocked_by
             FROM conversations WHERE user1_id = $1 OR user2_id = $1
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    /// Block a conversation on behalf of `blocker_id` (`spec.md` §4.6:
    /// a block closes the conversation for sending, both directions).
    pub async fn set_blocked(&self, conversation_id: i64, blocker_id: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE conversations SET blocked_by = $2, updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .bind(blocker_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn touch(&self, conversation_id: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
