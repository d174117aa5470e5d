//! Shared bearer-token `axum` extractor (`spec.md` §4.2: "verifies tokens
//! for other services").
//!
//! Every service downstream of the gateway verifies the bearer token's
//! signature and expiry locally against the shared `JWT_SECRET` rather
//! than calling back into Auth Service — handlers stay stateless and a
//! single network hop is not added to every authenticated request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::jwt;

/// Claims the caller presented, extracted and verified from
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
    pub telegram_id: i64,
}

/// Implemented by each service's `AppState` so [`AuthUser`] can be used as
/// an extractor without every service re-deriving the same boilerplate.
pub trait JwtSecretProvider {
    fn jwt_secret(&self) -> &str;
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: JwtSecretProvider + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingAuth)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::MissingAuth)?;
        let now = chrono::Utc::now().timestamp();

        let claims =
            jwt::verify(token, state.jwt_secret(), now).map_err(|_| ApiError::InvalidToken)?;

        Ok(AuthUser {
            user_id: claims.sub,
            telegram_id: claims.tg,
        })
    }
}
