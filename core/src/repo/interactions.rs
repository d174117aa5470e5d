use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::{Interaction, InteractionKind};

/// What happened when upserting an interaction (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed before; one was created.
    Created,
    /// A row existed with the same kind; only `updated_at` changed.
    Unchanged,
    /// A row existed with a different kind; the kind was changed.
    KindChanged,
}

/// Queries over `interactions` (`spec.md` §3, §4.4).
#[derive(Clone)]
pub struct InteractionRepo {
    pool: PgPool,
}

impl InteractionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert `(actor, target, kind)` under the unique `(actor_id,
    /// target_id)` constraint. Same-kind repeat touches `updated_at`
    /// only; a kind change updates the kind too (`spec.md` §4.4).
    pub async fn upsert(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: InteractionKind,
    ) -> Result<(Interaction, UpsertOutcome), ApiError> {
        let previous: Option<String> = sqlx::query_scalar(
            "SELECT kind FROM interactions WHERE actor_id = $1 AND target_id = $2",
        )
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        let outcome = match &previous {
            None => UpsertOutcome::Created,
            Some(k) if k == kind.to_string().as_str() => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::KindChanged,
        };

        let row = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO interactions (actor_id, target_id, kind, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (actor_id, target_id) DO UPDATE
                SET kind = EXCLUDED.kind, updated_at = now()
            RETURNING actor_id, target_id, kind, created_at, updated_at
            "#,
        )
        .bind(actor_id)
        .bind(target_id)
        .bind(kind.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok((row, outcome))
    }

    /// Find a specific directed interaction, if any.
    pub async fn find(&self, actor_id: i64, target_id: i64) -> Result<Option<Interaction>, ApiError> {
        let row = sqlx::query_as::<_, Interaction>(
            "SELECT actor_id, target_id, kind, created_at, updated_at
             FROM interactions WHERE actor_id = $1 AND target_id = $2",
        )
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Whether `target` has a positive (like/superlike) interaction
    /// toward `actor` — the reciprocal half of mutuality detection
    /// (`spec.md` §4.4).
    pub async fn has_positive(&self, actor: i64, target: i64) -> Result<bool, ApiError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM interactions
             WHERE actor_id = $1 AND target_id = $2 AND kind IN ('like', 'superlike'))",
        )
        .bind(actor)
        .bind(target)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// All target ids this user has already acted on (`spec.md` §4.4
    /// exclusion rule: any of the three kinds).
    pub async fn acted_on_targets(&self, actor_id: i64) -> Result<Vec<i64>, ApiError> {
        let targets: Vec<i64> =
            sqlx::query_scalar("SELECT target_id FROM interactions WHERE actor_id = $1")
                .bind(actor_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_distinguishes_created_unchanged_changed() {
        assert_ne!(UpsertOutcome::Created, UpsertOutcome::Unchanged);
        assert_ne!(UpsertOutcome::Unchanged, UpsertOutcome::KindChanged);
    }
}
