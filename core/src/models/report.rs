use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User-scoped moderation record (`spec.md` §3). Never affects matching
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_id: i64,
    pub category: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
