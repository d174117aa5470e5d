use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-scoped moderation record (`spec.md` §3). Prevents both parties
/// from exchanging messages and hides the blocker from the blocked
/// user's future discovery results.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
    pub id: i64,
    pub blocker_id: i64,
    pub blocked_id: i64,
    pub created_at: DateTime<Utc>,
}
