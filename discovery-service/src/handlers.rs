use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use datecore::auth::AuthUser;
use datecore::error::FieldError;
use datecore::models::{InteractionKind, Match};
use datecore::repo::CandidateFilters;
use datecore::ApiError;

use crate::ranking::{self, ScoreInputs};
use crate::state::AppState;

/// Profile lookup with a 5-minute TTL cache in front of it
/// (`spec.md` §4.4 step 7). Candidate lists themselves bypass this
/// cache entirely — only single-profile lookups go through it.
async fn cached_profile(
    state: &AppState,
    user_id: i64,
) -> Result<Option<datecore::models::Profile>, ApiError> {
    if let Some(profile) = state.profile_cache.get(user_id) {
        return Ok(Some(profile));
    }

    let profile = state.repos.profiles.find_by_user_id(user_id).await?;
    if let Some(profile) = &profile {
        state.profile_cache.put(user_id, profile.clone());
    }

    Ok(profile)
}

/// Over-fetch factor applied to the requested page size before the base
/// SQL set is narrowed further by orientation symmetry and distance,
/// neither of which can be pushed into the query (`spec.md` §4.4 steps 3-4).
const FETCH_MULTIPLIER: i64 = 6;
const MAX_FETCH: i64 = 300;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

/// A reference distance used only to turn a like/pass into a stored
/// [`Match::compatibility_score`]; the live ranking score a user actually
/// sees uses their own `max_distance_km` filter, but a match has no
/// requester-specific filter to reuse at the point it is created.
const COMPATIBILITY_REFERENCE_DISTANCE_KM: f64 = 100.0;

#[derive(Debug, Deserialize)]
pub struct CandidateQuery {
    pub user_id: i64,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub height_min: Option<i32>,
    pub height_max: Option<i32>,
    pub goal: Option<String>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub education: Option<String>,
    #[serde(default)]
    pub verified_only: bool,
    pub max_distance_km: Option<f64>,
}

/// `GET /discovery/candidates` (`spec.md` §4.4).
pub async fn list_candidates(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }

    let requester = cached_profile(&state, user.user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let today = Utc::now().date_naive();

    let filters = CandidateFilters {
        birth_date_max: query.age_min.map(|age| subtract_years(today, age)),
        birth_date_min: query.age_max.map(|age| subtract_years(today, age + 1)),
        height_min: query.height_min,
        height_max: query.height_max,
        goal: query.goal.clone(),
        has_children: query.has_children,
        wants_children: query.wants_children,
        smoking: query.smoking,
        drinking: query.drinking,
        education: query.education.clone(),
        verified_only: query.verified_only,
    };

    let exclude_ids = exclude_ids_for(&state, user.user_id).await?;
    let fetch_limit = (limit * FETCH_MULTIPLIER).min(MAX_FETCH);

    let candidates = state
        .repos
        .profiles
        .list_candidates(user.user_id, &exclude_ids, &filters, fetch_limit)
        .await?;

    let requester_coords = match (requester.lat, requester.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };
    let max_distance_km = query.max_distance_km.unwrap_or(f64::MAX);
    let now = Utc::now();

    let mut candidate_ids = Vec::with_capacity(candidates.len());
    let mut symmetric = Vec::with_capacity(candidates.len());
    for profile in candidates {
        // Orientation filter must hold in both directions (`spec.md`
        // §4.4 step 3): "a user who never appears to themselves must
        // also not appear to people they would not want."
        if !requester.orientation.matches(profile.gender) || !profile.orientation.matches(requester.gender) {
            continue;
        }

        if let (Some(req_coords), Some(lat), Some(lon)) = (requester_coords, profile.lat, profile.lon) {
            let distance = datecore::geo::haversine_km(req_coords.0, req_coords.1, lat, lon);
            if query.max_distance_km.is_some() && distance > max_distance_km {
                continue;
            }
        } else if query.max_distance_km.is_some() {
            // A distance filter was requested but one side lacks coordinates.
            continue;
        }

        candidate_ids.push(profile.user_id);
        symmetric.push(profile);
    }

    let last_seen = state.repos.users.last_seen_map(&candidate_ids).await?;

    let cursor = query
        .cursor
        .as_deref()
        .and_then(ranking::decode_cursor);

    let mut scored: Vec<(f64, Value)> = symmetric
        .into_iter()
        .map(|profile| {
            let candidate_coords = match (profile.lat, profile.lon) {
                (Some(lat), Some(lon)) => Some((lat, lon)),
                _ => None,
            };
            let candidate_last_seen = last_seen
                .get(&profile.user_id)
                .copied()
                .unwrap_or(now);

            let score = ranking::score(&ScoreInputs {
                requester_interests: &requester.interests,
                candidate_interests: &profile.interests,
                requester_goal_matches: requester.goal == profile.goal,
                requester_education: requester.education,
                candidate_education: profile.education,
                requester_coords,
                candidate_coords,
                max_distance_km: query.max_distance_km.unwrap_or(50.0),
                candidate_last_seen_at: candidate_last_seen,
                now,
            });

            (score, serde_json::to_value(&profile).unwrap_or(Value::Null))
        })
        .collect();

    scored.sort_by(|a, b| {
        let id_a = a.1.get("user_id").and_then(Value::as_i64).unwrap_or(0);
        let id_b = b.1.get("user_id").and_then(Value::as_i64).unwrap_or(0);
        (b.0, id_b)
            .partial_cmp(&(a.0, id_a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let page: Vec<_> = scored
        .into_iter()
        .filter(|(score, profile)| {
            let user_id = profile.get("user_id").and_then(Value::as_i64).unwrap_or(0);
            cursor.is_none_or(|c| ranking::is_after_cursor(*score, user_id, c))
        })
        .take(limit as usize)
        .collect();

    let next_cursor = if page.len() as i64 == limit {
        page.last().map(|(score, profile)| {
            let user_id = profile.get("user_id").and_then(Value::as_i64).unwrap_or(0);
            ranking::encode_cursor(*score, user_id)
        })
    } else {
        None
    };

    let items: Vec<Value> = page
        .into_iter()
        .map(|(score, profile)| json!({ "profile": profile, "score": score }))
        .collect();

    Ok(Json(json!({ "candidates": items, "next_cursor": next_cursor })))
}

fn subtract_years(date: chrono::NaiveDate, years: i32) -> chrono::NaiveDate {
    date.with_year(date.year() - years).unwrap_or(date)
}

/// Union of every id that must not appear in `user_id`'s candidate list
/// (`spec.md` §4.4 step 2): acted-on targets, match counterparties, and
/// anyone involved in a block either direction.
async fn exclude_ids_for(state: &AppState, user_id: i64) -> Result<Vec<i64>, ApiError> {
    let acted_on = state.repos.interactions.acted_on_targets(user_id).await?;
    let matches = state.repos.matches.list_for_user(user_id).await?;
    let blocked = state.repos.blocks.list_related(user_id).await?;

    let mut set: HashSet<i64> = acted_on.into_iter().collect();
    set.extend(matches.iter().filter_map(|m| m.counterparty(user_id)));
    set.extend(blocked);

    Ok(set.into_iter().collect())
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub target_id: i64,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub success: bool,
    pub matched: bool,
    pub match_id: Option<i64>,
    pub interaction_kind: String,
}

/// `POST /discovery/like` (`spec.md` §4.4).
pub async fn like(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(body): Json<LikeRequest>,
) -> Result<Json<LikeResponse>, ApiError> {
    let kind: InteractionKind = body
        .kind
        .parse()
        .map_err(|_| ApiError::Validation(vec![FieldError::new("kind", "must be like or superlike")]))?;

    if matches!(kind, InteractionKind::Pass) {
        return Err(ApiError::Validation(vec![FieldError::new(
            "kind",
            "use POST /discovery/pass to record a pass",
        )]));
    }

    if let Some(cached) = replay_idempotent(&state, &headers).await? {
        return Ok(Json(cached));
    }

    let response = record_interaction(&state, user.user_id, body.target_id, kind).await?;
    store_idempotent(&state, &headers, &response).await;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct PassRequest {
    pub target_id: i64,
}

/// `POST /discovery/pass` (`spec.md` §4.4). Never creates a match; a
/// prior like is simply overwritten (the "undo like" path).
pub async fn pass(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(body): Json<PassRequest>,
) -> Result<Json<LikeResponse>, ApiError> {
    if let Some(cached) = replay_idempotent(&state, &headers).await? {
        return Ok(Json(cached));
    }

    let response = record_interaction(&state, user.user_id, body.target_id, InteractionKind::Pass).await?;
    store_idempotent(&state, &headers, &response).await;
    Ok(Json(response))
}

async fn record_interaction(
    state: &AppState,
    actor_id: i64,
    target_id: i64,
    kind: InteractionKind,
) -> Result<LikeResponse, ApiError> {
    if actor_id == target_id {
        return Err(ApiError::Validation(vec![FieldError::new(
            "target_id",
            "cannot act on yourself",
        )]));
    }

    let target = cached_profile(state, target_id).await?.ok_or(ApiError::NotFound)?;

    if state.repos.blocks.blocks_either_way(actor_id, target_id).await? {
        return Err(ApiError::BlockedUser);
    }

    state.repos.interactions.upsert(actor_id, target_id, kind).await?;

    let mut matched = false;
    let mut match_id = None;

    if kind.is_positive() {
        let mutual = state.repos.interactions.has_positive(target_id, actor_id).await?;
        if mutual {
            let actor = cached_profile(state, actor_id).await?.ok_or(ApiError::NotFound)?;
            let target_last_seen = state
                .repos
                .users
                .find_by_id(target_id)
                .await?
                .map(|u| u.last_seen_at)
                .unwrap_or_else(Utc::now);

            let score = compatibility_score(&actor, &target, target_last_seen);
            let (lo, hi) = Match::canonical_pair(actor_id, target_id);
            let m = state
                .repos
                .matches
                .find_or_create(&state.repos.outbox, lo, hi, score)
                .await?;
            matched = true;
            match_id = Some(m.id);
        }
    }

    if !matched {
        let (lo, hi) = Match::canonical_pair(actor_id, target_id);
        if let Some(existing) = state.repos.matches.find_between(lo, hi).await? {
            matched = true;
            match_id = Some(existing.id);
        }
    }

    Ok(LikeResponse {
        success: true,
        matched,
        match_id,
        interaction_kind: kind.to_string(),
    })
}

fn compatibility_score(
    actor: &datecore::models::Profile,
    target: &datecore::models::Profile,
    target_last_seen: chrono::DateTime<Utc>,
) -> f64 {
    let actor_coords = match (actor.lat, actor.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };
    let target_coords = match (target.lat, target.lon) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };

    ranking::score(&ScoreInputs {
        requester_interests: &actor.interests,
        candidate_interests: &target.interests,
        requester_goal_matches: actor.goal == target.goal,
        requester_education: actor.education,
        candidate_education: target.education,
        requester_coords: actor_coords,
        candidate_coords: target_coords,
        max_distance_km: COMPATIBILITY_REFERENCE_DISTANCE_KM,
        candidate_last_seen_at: target_last_seen,
        now: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
pub struct MatchesQuery {
    pub user_id: i64,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// `GET /discovery/matches` (`spec.md` §4.4), ordered `created_at DESC,
/// id DESC` and cursor-paginated on that same ordering.
pub async fn list_matches(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MatchesQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.user_id != user.user_id {
        return Err(ApiError::Forbidden);
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let matches = state.repos.matches.list_for_user(user.user_id).await?;

    let cursor = query.cursor.as_deref().and_then(decode_match_cursor);

    let page: Vec<&Match> = matches
        .iter()
        .filter(|m| cursor.is_none_or(|c| is_after_match_cursor(m, c)))
        .take(limit as usize)
        .collect();

    let next_cursor = if page.len() as i64 == limit {
        page.last().map(|m| encode_match_cursor(m))
    } else {
        None
    };

    let mut items = Vec::with_capacity(page.len());
    for m in page {
        let counterparty_id = m.counterparty(user.user_id).unwrap_or(m.user1_id);
        let profile = cached_profile(&state, counterparty_id).await?;
        items.push(json!({ "match": m, "counterparty": profile }));
    }

    Ok(Json(json!({ "matches": items, "next_cursor": next_cursor })))
}

fn encode_match_cursor(m: &Match) -> String {
    format!("{}:{}", m.created_at.timestamp_micros(), m.id)
}

fn decode_match_cursor(cursor: &str) -> Option<(i64, i64)> {
    let (ts, id) = cursor.split_once(':')?;
    Some((ts.parse().ok()?, id.parse().ok()?))
}

fn is_after_match_cursor(m: &Match, cursor: (i64, i64)) -> bool {
    (m.created_at.timestamp_micros(), m.id) < cursor
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub target_id: i64,
}

/// `POST /discovery/favorites` (`spec.md` §4.4): adding an existing
/// favorite is a no-op, count bounded at 500.
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<FavoriteRequest>,
) -> Result<Json<Value>, ApiError> {
    let favorite = state.repos.favorites.add(user.user_id, body.target_id).await?;
    Ok(Json(serde_json::to_value(favorite).map_err(|e| ApiError::Internal(e.into()))?))
}

/// `DELETE /discovery/favorites/{target_id}`.
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.repos.favorites.remove(user.user_id, target_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `GET /discovery/favorites`.
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let favorites = state.repos.favorites.list_for_user(user.user_id).await?;
    Ok(Json(serde_json::to_value(favorites).map_err(|e| ApiError::Internal(e.into()))?))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

async fn replay_idempotent(state: &AppState, headers: &HeaderMap) -> Result<Option<LikeResponse>, ApiError> {
    let Some(key) = headers.get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };

    let Some((_status, body)) = state.idempotency.get(key).await else {
        return Ok(None);
    };

    let response = serde_json::from_slice(&body).map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Some(response))
}

async fn store_idempotent(state: &AppState, headers: &HeaderMap, response: &LikeResponse) {
    let Some(key) = headers.get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()) else {
        return;
    };

    if let Ok(body) = serde_json::to_vec(response) {
        state.idempotency.put(key.to_string(), 200, body).await;
    }
}
