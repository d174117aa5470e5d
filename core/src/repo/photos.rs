use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Photo;

/// Queries over `photos` (`spec.md` §3, §4.3).
#[derive(Clone)]
pub struct PhotoRepo {
    pool: PgPool,
}

impl PhotoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All photos for a profile, ordered by `sort_order`.
    pub async fn list_for_profile(&self, profile_id: i64) -> Result<Vec<Photo>, ApiError> {
        let photos = sqlx::query_as::<_, Photo>(
            "SELECT id, profile_id, url, sort_order, is_primary, nsfw_score, status, created_at
             FROM photos WHERE profile_id = $1 ORDER BY sort_order ASC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    /// Externally-visible photos only (`spec.md` §3: approved + under threshold).
    pub async fn list_visible(
        &self,
        profile_id: i64,
        nsfw_threshold: f64,
    ) -> Result<Vec<Photo>, ApiError> {
        let photos = sqlx::query_as::<_, Photo>(
            "SELECT id, profile_id, url, sort_order, is_primary, nsfw_score, status, created_at
             FROM photos
             WHERE profile_id = $1 AND status = 'approved' AND nsfw_score < $2
             ORDER BY sort_order ASC",
        )
        .bind(profile_id)
        .bind(nsfw_threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    /// Append a new photo at the end of the current ordering.
    pub async fn insert(&self, profile_id: i64, url: &str) -> Result<Photo, ApiError> {
        let next_order: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM photos WHERE profile_id = $1")
                .bind(profile_id)
                .fetch_one(&self.pool)
                .await?;

        let photo = sqlx::query_as::<_, Photo>(
            "INSERT INTO photos (profile_id, url, sort_order, is_primary, nsfw_score, status)
             VALUES ($1, $2, $3, false, 0.0, 'pending')
             RETURNING id, profile_id, url, sort_order, is_primary, nsfw_score, status, created_at",
        )
        .bind(profile_id)
        .bind(url)
        .bind(next_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(photo)
    }

    /// Delete a photo and renumber the remaining photos to stay dense
    /// (`spec.md` §4.3, "renumbering sort_order to be dense on deletes").
    pub async fn delete_and_renumber(&self, profile_id: i64, photo_id: i64) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM photos WHERE id = $1 AND profile_id = $2")
            .bind(photo_id)
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            WITH ranked AS (
                SELECT id, ROW_NUMBER() OVER (ORDER BY sort_order ASC) - 1 AS new_order
                FROM photos WHERE profile_id = $1
            )
            UPDATE photos SET sort_order = ranked.new_order
            FROM ranked WHERE photos.id = ranked.id
            "#,
        )
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Set exactly one photo as primary, clearing any previous primary
    /// (`spec.md` §3: "at most one per profile").
    pub async fn set_primary(&self, profile_id: i64, photo_id: i64) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE photos SET is_primary = false WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE photos SET is_primary = true WHERE id = $1 AND profile_id = $2")
            .bind(photo_id)
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Whether this profile has an approved primary photo
    /// (`spec.md` §4.4's `verified_only` filter).
    pub async fn has_approved_primary(&self, profile_id: i64) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM photos WHERE profile_id = $1 AND is_primary AND status = 'approved')",
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
