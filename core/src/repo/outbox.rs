use serde_json::Value;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::OutboxEvent;

/// Attempts beyond which a notification-relay worker gives up and leaves
/// the row as a permanent failure (`spec.md` §4.6 retry policy).
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;

/// Exponential backoff schedule, indexed by attempts-so-far
/// (`spec.md` §4.6: "1 s, 2 s, 4 s, 8 s, 16 s; cap 5 attempts").
const BACKOFF_SECONDS: [i64; 5] = [1, 2, 4, 8, 16];

/// Delay, in seconds, before the next claim eligibility after `attempts`
/// failures.
pub fn backoff_for(attempts: i32) -> i64 {
    let idx = usize::try_from(attempts.max(0)).unwrap_or(0).min(BACKOFF_SECONDS.len() - 1);
    BACKOFF_SECONDS[idx]
}

/// Queries over `outbox_events` (`spec.md` §3, §9 outbox pattern).
#[derive(Clone)]
pub struct OutboxRepo {
    pool: PgPool,
}

impl OutboxRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue an event inside the caller's write transaction, so the
    /// event and the write it describes commit or roll back together.
    /// A duplicate `dedup_key` is silently absorbed rather than erroring,
    /// since retried producers (e.g. a WebSocket reconnect replaying an
    /// unacked send) must be able to call this more than once safely.
    pub async fn enqueue(
        &self,
        tx: &mut sqlx::PgConnection,
        kind: &str,
        payload: Value,
        dedup_key: &str,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (kind, payload, dedup_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (dedup_key) DO NOTHING
            "#,
        )
        .bind(kind)
        .bind(payload)
        .bind(dedup_key)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// Claim up to `limit` rows eligible for delivery right now, oldest
    /// first, for a relay poll cycle (`spec.md` §4.6). `next_attempt_at`
    /// holds a row back until its backoff delay elapses. No
    /// `SELECT ... FOR UPDATE SKIP LOCKED` is used since the relay runs
    /// as a single instance; see `DESIGN.md`.
    pub async fn claim_batch(&self, limit: i64) -> Result<Vec<OutboxEvent>, ApiError> {
        let events = sqlx::query_as::<_, OutboxEvent>(
            r#"
            SELECT id, kind, payload, dedup_key, created_at, delivered_at, attempts, last_error, next_attempt_at
            FROM outbox_events
            WHERE delivered_at IS NULL AND attempts < $1 AND next_attempt_at <= now()
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(MAX_DELIVERY_ATTEMPTS)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Mark a row as permanently dropped (a 4xx from the Bot — `spec.md`
    /// §4.6: "4xx from Bot is final and dropped"). Sets `attempts` to the
    /// cap directly rather than incrementing, so `claim_batch` excludes it
    /// immediately regardless of how many attempts it had left.
    pub async fn mark_permanently_failed(&self, id: i64, error: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE outbox_events SET attempts = $2, last_error = $3 WHERE id = $1")
            .bind(id)
            .bind(MAX_DELIVERY_ATTEMPTS)
            .bind(error)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_delivered(&self, id: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE outbox_events SET delivered_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record a failed delivery attempt and schedule the next one per the
    /// backoff schedule. `attempts_after` is the post-increment count,
    /// used to size the delay.
    pub async fn mark_failed(&self, id: i64, error: &str, attempts_after: i32) -> Result<(), ApiError> {
        let delay_seconds = backoff_for(attempts_after) as f64;
        sqlx::query(
            "UPDATE outbox_events
             SET attempts = attempts + 1, last_error = $2, next_attempt_at = now() + make_interval(secs => $3)
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(delay_seconds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_follows_the_documented_schedule() {
        assert_eq!(backoff_for(0), 1);
        assert_eq!(backoff_for(1), 2);
        assert_eq!(backoff_for(4), 16);
    }

    #[test]
    fn backoff_clamps_beyond_the_cap() {
        assert_eq!(backoff_for(5), 16);
        assert_eq!(backoff_for(100), 16);
    }
}
