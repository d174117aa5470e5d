use sqlx::PgPool;

use super::outbox::OutboxRepo;
use crate::error::ApiError;
use crate::models::Match;

/// Queries over `matches` (`spec.md` §3, §4.4).
#[derive(Clone)]
pub struct MatchRepo {
    pool: PgPool,
}

impl MatchRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the match for a canonically-ordered pair, or return the
    /// existing one. Two actors can race to create the same pair when
    /// both sides like each other within the same window; the unique
    /// constraint on `(user1_id, user2_id)` makes the loser observe a
    /// conflict, at which point it reads back the winner's row instead
    /// of erroring (`spec.md` §4.4 mutuality creates "exactly one" match).
    ///
    /// On an actual insert (not a conflict read-back), enqueues the
    /// `discovery.match.created` outbox event in the same transaction
    /// (`spec.md` §4.6), so the notification never fires for a match
    /// that was only ever read, not created, by this call.
    pub async fn find_or_create(
        &self,
        outbox: &OutboxRepo,
        user1_id: i64,
        user2_id: i64,
        compatibility_score: f64,
    ) -> Result<Match, ApiError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Match>(
            r#"
            INSERT INTO matches (user1_id, user2_id, compatibility_score)
            VALUES ($1, $2, $3)
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            RETURNING id, user1_id, user2_id, created_at, compatibility_score
            "#,
        )
        .bind(user1_id)
        .bind(user2_id)
        .bind(compatibility_score)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(m) = inserted {
            // One row per recipient rather than one row naming both, so
            // each notification retries and dedups independently.
            for (recipient_id, counterparty_id) in [(user1_id, user2_id), (user2_id, user1_id)] {
                let payload = serde_json::json!({
                    "match_id": m.id,
                    "recipient_id": recipient_id,
                    "counterparty_id": counterparty_id,
                });
                let dedup_key = format!("match:{}:{recipient_id}", m.id);
                outbox
                    .enqueue(&mut tx, "discovery.match.created", payload, &dedup_key)
                    .await?;
            }
            tx.commit().await?;
            return Ok(m);
        }

        tx.commit().await?;

        let existing = sqlx::query_as::<_, Match>(
            "SELECT id, user1_id, user2_id, created_at, compatibility_score
             FROM matches WHERE user1_id = $1 AND user2_id = $2",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    pub async fn find_between(&self, user1_id: i64, user2_id: i64) -> Result<Option<Match>, ApiError> {
        let m = sqlx::query_as::<_, Match>(
            "SELECT id, user1_id, user2_id, created_at, compatibility_score
             FROM matches WHERE user1_id = $1 AND user2_id = $2",
        )
        .bind(user1_id)
        .bind(user2_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(m)
    }

    /// All matches a user participates in, most recent first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Match>, ApiError> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT id, user1_id, user2_id, created_at, compatibility_score
             FROM matches WHERE user1_id = $1 OR user2_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }
}
