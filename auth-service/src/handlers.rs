use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use datecore::jwt::{self, Claims};
use datecore::telegram_init_data;
use datecore::ApiError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    init_data: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    token: String,
    user_id: i64,
    username: Option<String>,
}

/// `POST /auth/validate` (`spec.md` §4.2).
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let now = Utc::now().timestamp();
    let max_age = state.telegram.init_data_max_age.as_secs() as i64;

    let verified = telegram_init_data::verify(&body.init_data, &state.telegram.bot_token, now, max_age)
        .map_err(|err| match err {
            telegram_init_data::InitDataError::Expired => ApiError::ExpiredInitData,
            _ => ApiError::InvalidInitData,
        })?;

    let user = state
        .repos
        .users
        .upsert_by_telegram_id(verified.telegram_id, verified.username.as_deref())
        .await?;

    let claims = Claims {
        sub: user.id,
        tg: user.telegram_id,
        iat: now,
        exp: now + state.jwt.ttl.as_secs() as i64,
    };
    let token = jwt::mint(&claims, &state.jwt.secret).map_err(|_| ApiError::Internal(anyhow::anyhow!("token mint failed")))?;

    Ok(Json(ValidateResponse {
        token,
        user_id: user.id,
        username: user.telegram_username,
    }))
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    valid: bool,
    user_id: i64,
}

/// `GET /auth/verify` (`spec.md` §4.2).
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, ApiError> {
    let claims = authenticate(&state, &headers).await?;

    Ok(Json(VerifyResponse {
        valid: true,
        user_id: claims.sub,
    }))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    token: String,
}

/// `POST /auth/refresh` (`spec.md` §4.2).
///
/// Refuses only when the token is within its last 10% of lifetime *and*
/// belongs to a now-blocked user; every other still-valid token refreshes.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let claims = authenticate_signature_only(&state, &headers)?;
    let now = Utc::now().timestamp();

    let fraction_remaining = jwt::remaining_fraction(&claims, now);
    if fraction_remaining <= 0.1 {
        let blocked = state.repos.users.is_blocked(claims.sub).await?;
        if blocked {
            return Err(ApiError::BlockedUser);
        }
    }

    let new_claims = Claims {
        sub: claims.sub,
        tg: claims.tg,
        iat: now,
        exp: now + state.jwt.ttl.as_secs() as i64,
    };
    let token = jwt::mint(&new_claims, &state.jwt.secret)
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("token mint failed")))?;

    Ok(Json(RefreshResponse { token }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingAuth)?;

    value.strip_prefix("Bearer ").ok_or(ApiError::MissingAuth)
}

/// Verify the token's signature and expiry, and reject if the user is
/// currently blocked (`spec.md` §4.2 `/auth/verify`).
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let claims = authenticate_signature_only(state, headers)?;

    if state.repos.users.is_blocked(claims.sub).await? {
        return Err(ApiError::BlockedUser);
    }

    Ok(claims)
}

fn authenticate_signature_only(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;
    let now = Utc::now().timestamp();

    jwt::verify(token, &state.jwt.secret, now).map_err(|_| ApiError::InvalidToken)
}
