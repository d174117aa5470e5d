use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record keyed by external `telegram_id` (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Internal surrogate id.
    pub id: i64,
    /// External Telegram user id, unique.
    pub telegram_id: i64,
    /// Telegram `@username`, if the user has one set.
    pub telegram_username: Option<String>,
    /// When the row was created (first successful auth).
    pub created_at: DateTime<Utc>,
    /// Last time this user authenticated or was otherwise active.
    pub last_seen_at: DateTime<Utc>,
    /// Soft-blocked users are retained for audit, never deleted.
    pub is_blocked: bool,
    /// Abuse/trust signal, opaque to this crate.
    pub risk_score: f64,
}
