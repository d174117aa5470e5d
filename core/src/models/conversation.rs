use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1:1 with a [`crate::models::Match`], or between consenting users
/// (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub blocked_by: Option<i64>,
}

impl Conversation {
    /// Canonical `(lower, higher)` ordering, same rule as [`crate::models::Match`].
    pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// The id of the counterparty to `user_id`.
    pub fn counterparty(&self, user_id: i64) -> Option<i64> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }

    /// Whether `user_id` is a participant in this conversation.
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// Whether the conversation is currently blocked (by either party).
    pub fn is_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }
}
