use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::User;

/// Queries over `users` (`spec.md` §3, §4.2).
#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensure a `User` row exists for `telegram_id`, creating it on first
    /// auth (`spec.md` §4.2 step "ensure a User row exists (upsert by
    /// telegram_id)"). Updates `telegram_username` and `last_seen_at` on
    /// every call, whether newly created or not.
    pub async fn upsert_by_telegram_id(
        &self,
        telegram_id: i64,
        telegram_username: Option<&str>,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, telegram_username, last_seen_at)
            VALUES ($1, $2, now())
            ON CONFLICT (telegram_id) DO UPDATE
                SET telegram_username = EXCLUDED.telegram_username,
                    last_seen_at = now()
            RETURNING id, telegram_id, telegram_username, created_at, last_seen_at, is_blocked, risk_score
            "#,
        )
        .bind(telegram_id)
        .bind(telegram_username)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Look up by internal surrogate id.
    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, telegram_id, telegram_username, created_at, last_seen_at, is_blocked, risk_score
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Whether `user_id` is currently blocked (`spec.md` §4.2 `/auth/verify`).
    pub async fn is_blocked(&self, user_id: i64) -> Result<bool, ApiError> {
        let blocked: Option<bool> = sqlx::query_scalar("SELECT is_blocked FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(blocked.unwrap_or(true))
    }

    /// Batch `last_seen_at` lookup for ranking's freshness term
    /// (`spec.md` §4.4 step 5), avoiding one query per candidate.
    pub async fn last_seen_map(&self, ids: &[i64]) -> Result<HashMap<i64, DateTime<Utc>>, ApiError> {
        let rows: Vec<(i64, DateTime<Utc>)> =
            sqlx::query_as("SELECT id, last_seen_at FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}
