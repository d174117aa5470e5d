use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-(conversation, user) high-water mark (`spec.md` §3). May only
/// move forward; callers should use `GREATEST` in the update query
/// rather than trusting application-level comparisons under concurrency.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReadCursor {
    pub conversation_id: i64,
    pub user_id: i64,
    pub last_read_message_id: i64,
    pub last_read_at: DateTime<Utc>,
}
