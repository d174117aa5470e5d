use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Block;

/// Queries over `blocks` (`spec.md` §3, §4.6).
#[derive(Clone)]
pub struct BlockRepo {
    pool: PgPool,
}

impl BlockRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, blocker_id: i64, blocked_id: i64) -> Result<Block, ApiError> {
        let block = sqlx::query_as::<_, Block>(
            r#"
            INSERT INTO blocks (blocker_id, blocked_id)
            VALUES ($1, $2)
            ON CONFLICT (blocker_id, blocked_id) DO UPDATE SET blocker_id = EXCLUDED.blocker_id
            RETURNING id, blocker_id, blocked_id, created_at
            "#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(block)
    }

    pub async fn remove(&self, blocker_id: i64, blocked_id: i64) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Whether either user has blocked the other (`spec.md` §4.6: blocks
    /// are one-directional to create but symmetric in effect).
    pub async fn blocks_either_way(&self, a: i64, b: i64) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM blocks
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_blocked_by(&self, blocker_id: i64) -> Result<Vec<i64>, ApiError> {
        let blocked: Vec<i64> =
            sqlx::query_scalar("SELECT blocked_id FROM blocks WHERE blocker_id = $1")
                .bind(blocker_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(blocked)
    }

    /// Every id on the other end of a block involving `user_id`, either
    /// direction (`spec.md` §4.4 discovery exclusion step 2).
    pub async fn list_related(&self, user_id: i64) -> Result<Vec<i64>, ApiError> {
        let related: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT blocked_id FROM blocks WHERE blocker_id = $1
            UNION
            SELECT blocker_id FROM blocks WHERE blocked_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(related)
    }
}
