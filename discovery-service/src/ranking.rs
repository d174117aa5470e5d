//! Candidate ranking (`spec.md` §4.4 step 5).
//!
//! Weights sum to 1.0: interest overlap 0.40, same-goal bonus 0.20,
//! education-tier proximity 0.10, location proximity 0.20, freshness 0.10.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use datecore::geo;
use datecore::models::Education;

const WEIGHT_INTERESTS: f64 = 0.40;
const WEIGHT_GOAL: f64 = 0.20;
const WEIGHT_EDUCATION: f64 = 0.10;
const WEIGHT_LOCATION: f64 = 0.20;
const WEIGHT_FRESHNESS: f64 = 0.10;

/// Half-life of the freshness decay, in days (`spec.md` §4.4 step 5).
const FRESHNESS_HALF_LIFE_DAYS: f64 = 7.0;

/// Inputs to the ranking score for a single (requester, candidate) pair.
pub struct ScoreInputs<'a> {
    pub requester_interests: &'a [String],
    pub candidate_interests: &'a [String],
    pub requester_goal_matches: bool,
    pub requester_education: Option<Education>,
    pub candidate_education: Option<Education>,
    pub requester_coords: Option<(f64, f64)>,
    pub candidate_coords: Option<(f64, f64)>,
    pub max_distance_km: f64,
    pub candidate_last_seen_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// Jaccard similarity of two interest sets.
pub fn interest_overlap(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// `1 - |tier_a - tier_b| / max_tier`, or `0.0` if either side lacks an
/// education value (no basis for proximity).
fn education_proximity(a: Option<Education>, b: Option<Education>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let diff = (a.tier() as f64 - b.tier() as f64).abs();
            1.0 - diff / f64::from(Education::MAX_TIER)
        }
        _ => 0.0,
    }
}

/// `1 - min(distance_km, max_distance_km) / max_distance_km`, or `0.0` if
/// either side lacks coordinates.
fn location_proximity(a: Option<(f64, f64)>, b: Option<(f64, f64)>, max_distance_km: f64) -> f64 {
    match (a, b) {
        (Some((lat1, lon1)), Some((lat2, lon2))) if max_distance_km > 0.0 => {
            let distance = geo::haversine_km(lat1, lon1, lat2, lon2);
            1.0 - distance.min(max_distance_km) / max_distance_km
        }
        _ => 0.0,
    }
}

/// Exponential decay on `last_seen_at` with the configured half-life.
fn freshness(last_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - last_seen_at).num_seconds().max(0) as f64 / 86_400.0;
    0.5_f64.powf(age_days / FRESHNESS_HALF_LIFE_DAYS)
}

/// Combine every component into the final ranking score in `[0, 1]`.
pub fn score(inputs: &ScoreInputs<'_>) -> f64 {
    let interests = interest_overlap(inputs.requester_interests, inputs.candidate_interests);
    let goal = if inputs.requester_goal_matches { 1.0 } else { 0.0 };
    let education = education_proximity(inputs.requester_education, inputs.candidate_education);
    let location = location_proximity(
        inputs.requester_coords,
        inputs.candidate_coords,
        inputs.max_distance_km,
    );
    let fresh = freshness(inputs.candidate_last_seen_at, inputs.now);

    interests * WEIGHT_INTERESTS
        + goal * WEIGHT_GOAL
        + education * WEIGHT_EDUCATION
        + location * WEIGHT_LOCATION
        + fresh * WEIGHT_FRESHNESS
}

/// Opaque pagination cursor: `"<score>:<user_id>"` (`spec.md` §4.4 step 6).
pub fn encode_cursor(score: f64, user_id: i64) -> String {
    format!("{score}:{user_id}")
}

/// Parse a cursor back into `(score, user_id)`. Malformed cursors are
/// treated as "no cursor" by the caller rather than erroring, since a
/// stale or tampered cursor should degrade to a first page, not a 500.
pub fn decode_cursor(cursor: &str) -> Option<(f64, i64)> {
    let (score_str, id_str) = cursor.split_once(':')?;
    let score: f64 = score_str.parse().ok()?;
    let user_id: i64 = id_str.parse().ok()?;
    Some((score, user_id))
}

/// Whether `(score, user_id)` sorts strictly after `cursor` under the
/// ranking order (descending score, ties broken by descending `user_id`).
pub fn is_after_cursor(score: f64, user_id: i64, cursor: (f64, i64)) -> bool {
    let (cursor_score, cursor_id) = cursor;
    (score, user_id) < (cursor_score, cursor_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_overlap_is_jaccard() {
        let a = vec!["hiking".to_string(), "coffee".to_string()];
        let b = vec!["coffee".to_string(), "chess".to_string()];
        assert!((interest_overlap(&a, &b) - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_interests_score_zero_not_nan() {
        assert_eq!(interest_overlap(&[], &[]), 0.0);
    }

    #[test]
    fn education_proximity_is_one_for_identical_tiers() {
        assert_eq!(
            education_proximity(Some(Education::Bachelor), Some(Education::Bachelor)),
            1.0
        );
    }

    #[test]
    fn cursor_round_trips() {
        let c = encode_cursor(0.42, 77);
        assert_eq!(decode_cursor(&c), Some((0.42, 77)));
    }

    #[test]
    fn malformed_cursor_decodes_to_none() {
        assert_eq!(decode_cursor("garbage"), None);
    }
}
