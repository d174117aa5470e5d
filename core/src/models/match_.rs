use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Undirected link created on mutual like/superlike (`spec.md` §3).
///
/// Always stored with `user1_id < user2_id` so the pair is unique;
/// [`Match::canonical_pair`] is the single place that ordering is
/// computed, so callers never construct a non-canonical pair by hand.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub created_at: DateTime<Utc>,
    pub compatibility_score: f64,
}

impl Match {
    /// Canonical `(lower, higher)` ordering for a pair of user ids.
    pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// The id of the counterparty to `user_id` in this match.
    ///
    /// Returns `None` if `user_id` is not actually a participant.
    pub fn counterparty(&self, user_id: i64) -> Option<i64> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_always_ascending() {
        assert_eq!(Match::canonical_pair(20, 10), (10, 20));
        assert_eq!(Match::canonical_pair(10, 20), (10, 20));
    }
}
