use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use datecore::auth::AuthUser;
use datecore::geo;
use datecore::repo::ProfileUpsert;
use datecore::ApiError;

use crate::state::AppState;
use crate::validation::{self, ProfileRequest};

/// `GET /profiles/{user_id}` (`spec.md` §4.3).
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let profile = state
        .repos
        .profiles
        .find_by_user_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(serde_json::to_value(profile).map_err(|e| ApiError::Internal(e.into()))?))
}

/// `POST /profiles` (`spec.md` §4.3).
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let validated = validation::validate_create(&body).map_err(ApiError::Validation)?;

    let fields = to_upsert(&validated);
    let profile = state.repos.profiles.create(user.user_id, &fields).await?;

    Ok(Json(serde_json::to_value(profile).map_err(|e| ApiError::Internal(e.into()))?))
}

/// `PATCH /profiles/{user_id}` (`spec.md` §4.3).
pub async fn patch_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<i64>,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    validation::check_immutable(&body).map_err(ApiError::Validation)?;

    let existing = state
        .repos
        .profiles
        .find_by_user_id(user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    // birth_date/gender are immutable; the validated request reuses the
    // stored values so `validate_create`'s shape still applies.
    let mut merged = body;
    merged.birth_date = Some(existing.birth_date);
    merged.gender = Some(existing.gender.to_string());

    let validated = validation::validate_create(&merged).map_err(ApiError::Validation)?;
    let complete = validation::is_complete(&validated);

    let fields = to_upsert(&validated);
    let profile = state
        .repos
        .profiles
        .update_mutable_fields(user_id, &fields, complete)
        .await?;

    Ok(Json(serde_json::to_value(profile).map_err(|e| ApiError::Internal(e.into()))?))
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    user_id: i64,
}

/// `GET /profiles/check?user_id=...` (`spec.md` §4.3).
pub async fn check_exists(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<Value>, ApiError> {
    let exists = state.repos.profiles.exists(query.user_id).await?;
    Ok(Json(json!({ "exists": exists })))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
pub struct AddPhotoRequest {
    url: String,
}

/// `POST /profiles/{user_id}/photos` — register media already uploaded to
/// the external Media service (`spec.md` §4.3: "binary storage is the
/// Media service; the profile service stores the metadata").
pub async fn add_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<i64>,
    Json(body): Json<AddPhotoRequest>,
) -> Result<Json<Value>, ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    let photo = state.repos.photos.insert(user_id, &body.url).await?;
    Ok(Json(serde_json::to_value(photo).map_err(|e| ApiError::Internal(e.into()))?))
}

/// `GET /profiles/{user_id}/photos`.
pub async fn list_photos(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let photos = state.repos.photos.list_for_profile(user_id).await?;
    Ok(Json(serde_json::to_value(photos).map_err(|e| ApiError::Internal(e.into()))?))
}

/// `DELETE /profiles/{user_id}/photos/{photo_id}` (`spec.md` §4.3:
/// "renumbering sort_order to be dense on deletes").
pub async fn delete_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((user_id, photo_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    state.repos.photos.delete_and_renumber(user_id, photo_id).await?;
    Ok(Json(json!({"success": true})))
}

/// `POST /profiles/{user_id}/photos/{photo_id}/primary` (`spec.md` §3:
/// "at most one [primary] per profile").
pub async fn set_primary_photo(
    State(state): State<AppState>,
    user: AuthUser,
    Path((user_id, photo_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, ApiError> {
    if user.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    state.repos.photos.set_primary(user_id, photo_id).await?;
    Ok(Json(json!({"success": true})))
}

fn to_upsert(validated: &validation::ValidatedProfile) -> ProfileUpsert {
    let geohash = match (validated.lat, validated.lon) {
        (Some(lat), Some(lon)) => Some(geo::encode(lat, lon, geo::PRECISION_5KM)),
        _ => None,
    };

    ProfileUpsert {
        name: validated.name.clone(),
        birth_date: validated.birth_date,
        gender: validated.gender.to_string(),
        orientation: validated.orientation.to_string(),
        goal: validated.goal.to_string(),
        bio: validated.bio.clone(),
        interests: validated.interests.clone(),
        height_cm: validated.height_cm,
        education: validated.education.map(|e| e.to_string()),
        has_children: validated.has_children,
        wants_children: validated.wants_children,
        smoking: validated.smoking,
        drinking: validated.drinking,
        country: validated.country.clone(),
        city: validated.city.clone(),
        lat: validated.lat,
        lon: validated.lon,
        geohash,
        hide_age: validated.hide_age,
        hide_distance: validated.hide_distance,
        hide_online: validated.hide_online,
        allow_messages_from: validated.allow_messages_from.to_string(),
        is_visible: validated.is_visible,
    }
}
