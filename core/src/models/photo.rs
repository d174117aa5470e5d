use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// N:1 to [`crate::models::Profile`] (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i64,
    pub profile_id: i64,
    pub url: String,
    /// 0-based, stable, dense (renumbered on delete/reorder).
    pub sort_order: i32,
    /// At most one `true` per profile.
    pub is_primary: bool,
    pub nsfw_score: f64,
    pub status: PhotoStatus,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// Visible externally iff approved and under the NSFW threshold.
    pub fn is_externally_visible(&self, nsfw_threshold: f64) -> bool {
        self.status == PhotoStatus::Approved && self.nsfw_score < nsfw_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PhotoStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        })
    }
}

impl FromStr for PhotoStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("invalid photo status: {other}")),
        }
    }
}
