use sqlx::PgPool;

use crate::error::{ApiError, FieldError};
use crate::models::{Favorite, MAX_FAVORITES_PER_USER};

/// Queries over `favorites` (`spec.md` §3, §4.4).
#[derive(Clone)]
pub struct FavoriteRepo {
    pool: PgPool,
}

impl FavoriteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Add a favorite, rejecting once the user is at the cap
    /// (`spec.md` §4.4 `MAX_FAVORITES_PER_USER`).
    pub async fn add(&self, user_id: i64, target_id: i64) -> Result<Favorite, ApiError> {
        let count = self.count_for_user(user_id).await?;
        if count >= MAX_FAVORITES_PER_USER {
            return Err(ApiError::Validation(vec![FieldError::new("target_id", "favorites limit reached")]));
        }

        let favorite = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, target_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, target_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, target_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(favorite)
    }

    pub async fn remove(&self, user_id: i64, target_id: i64) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND target_id = $2")
            .bind(user_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Favorite>, ApiError> {
        let favorites = sqlx::query_as::<_, Favorite>(
            "SELECT user_id, target_id, created_at FROM favorites
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }
}
