//! Stable error taxonomy (`spec.md` §6.1, §7).
//!
//! Every handler in every service returns `Result<T, ApiError>`.
//! `ApiError` knows how to render itself as the standard envelope
//! `{ "error": { "code", "message", "details" } }` with the matching
//! HTTP status, so handlers never format error bodies by hand.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// A single field-level validation failure, surfaced in a 422's `details`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    /// Build a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The machine-readable error codes from `spec.md` §6.1, plus two
/// auth-specific codes from §4.2's taxonomy that are not otherwise named
/// in the public error table (`invalid_init_data` / `expired_init_data`).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Telegram `initData` failed HMAC verification.
    #[error("invalid init data")]
    InvalidInitData,
    /// `initData.auth_date` is older than the configured max age.
    #[error("expired init data")]
    ExpiredInitData,
    /// Bearer token missing, malformed, expired, or signature mismatch.
    #[error("invalid token")]
    InvalidToken,
    /// No `Authorization` header present where one is required.
    #[error("missing authorization")]
    MissingAuth,
    /// Request body failed per-field validation.
    #[error("validation error")]
    Validation(Vec<FieldError>),
    /// The referenced resource does not exist.
    #[error("not found")]
    NotFound,
    /// The request would violate a meaningful invariant (e.g. a duplicate
    /// conversation for a pair that already has one with a different id).
    #[error("conflict")]
    Conflict(String),
    /// Caller exceeded their rate limit; `retry_after` is in seconds.
    #[error("rate limited")]
    RateLimited {
        /// Seconds until the caller may retry.
        retry_after: u64,
    },
    /// The acting or target user is blocked.
    #[error("blocked user")]
    BlockedUser,
    /// Authenticated, but not permitted to perform this action.
    #[error("forbidden")]
    Forbidden,
    /// An upstream/internal dependency is unavailable.
    #[error("service unavailable")]
    ServiceUnavailable,
    /// Upstream call exceeded its deadline.
    #[error("gateway timeout")]
    GatewayTimeout,
    /// Anything else: logged with full context, never detailed to the caller.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// The machine-readable `code` field of the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInitData => "invalid_init_data",
            Self::ExpiredInitData => "expired_init_data",
            Self::InvalidToken => "invalid_token",
            Self::MissingAuth => "missing_auth",
            Self::Validation(_) => "validation_error",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited { .. } => "rate_limited",
            Self::BlockedUser => "blocked_user",
            Self::Forbidden => "forbidden",
            Self::ServiceUnavailable => "service_unavailable",
            Self::GatewayTimeout => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// The HTTP status mapping from `spec.md` §6.1.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInitData | Self::ExpiredInitData | Self::InvalidToken | Self::MissingAuth => {
                StatusCode::UNAUTHORIZED
            }
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::BlockedUser | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Validation(fields) => serde_json::json!({ "fields": fields }),
            Self::RateLimited { retry_after } => serde_json::json!({ "retry_after": retry_after }),
            Self::Conflict(reason) => serde_json::json!({ "reason": reason }),
            _ => Value::Null,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorEnvelope,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    code: &'static str,
    message: String,
    details: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }

        let status = self.status();
        let mut response = (
            status,
            Json(ErrorBody {
                error: ErrorEnvelope {
                    code: self.code(),
                    message: self.public_message(),
                    details: self.details(),
                },
            }),
        )
            .into_response();

        if let Self::RateLimited { retry_after } = &self {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_status_family() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BlockedUser.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::RateLimited { retry_after: 5 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::NotFound.code(), "not_found");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("duplicate key value violates constraint"));
        assert_eq!(err.public_message(), "an internal error occurred");
    }
}
