use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor->target bookmark, independent of likes and matches (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Favorite {
    pub user_id: i64,
    pub target_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Max favorites per user (`spec.md` §4.4).
pub const MAX_FAVORITES_PER_USER: i64 = 500;
