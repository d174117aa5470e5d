use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Durable outbound-event record (`spec.md` §9: "outbox pattern for
/// notification delivery" — a write and its side-effecting notification
/// commit in the same transaction, so a crash between them cannot drop
/// the notification or duplicate the write).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEvent {
    pub id: i64,
    pub kind: String,
    pub payload: Value,
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
}
