use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// N:M user->user event, keyed by `(actor_id, target_id)` (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    pub actor_id: i64,
    pub target_id: i64,
    pub kind: InteractionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Superlike,
    Pass,
}

impl InteractionKind {
    /// Whether this kind counts toward mutual-like match detection
    /// (`spec.md` §4.4, "kind ∈ {like, superlike}").
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Like | Self::Superlike)
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Like => "like",
            Self::Superlike => "superlike",
            Self::Pass => "pass",
        })
    }
}

impl FromStr for InteractionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "superlike" => Ok(Self::Superlike),
            "pass" => Ok(Self::Pass),
            other => Err(format!("invalid interaction kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_like_and_superlike_are_positive() {
        assert!(InteractionKind::Like.is_positive());
        assert!(InteractionKind::Superlike.is_positive());
        assert!(!InteractionKind::Pass.is_positive());
    }
}
