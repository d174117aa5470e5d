//! Token-bucket rate limiting (`spec.md` §4.1, §5): keyed by authenticated
//! subject when a valid bearer token is present, otherwise by source IP.
//! Buckets refill continuously rather than resetting once a minute, so
//! traffic near a minute boundary doesn't see a sudden refill spike.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use datecore::config::RateLimitConfig;

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity_rpm: u32) -> Self {
        let capacity = f64::from(capacity_rpm);
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    /// Refill for elapsed time, then try to take one token.
    /// Returns `Ok(())` if allowed, or `Err(retry_after_secs)` if not.
    fn try_consume(&mut self) -> Result<(), u64> {
        let elapsed = self.last_refill.elapsed().as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = Instant::now();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            let wait_secs = (deficit / self.refill_per_sec).ceil().max(1.0);
            Err(wait_secs as u64)
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { buckets: Arc::new(Mutex::new(HashMap::new())), config }
    }

    async fn check(&self, key: String, authenticated: bool) -> Result<(), u64> {
        let capacity_rpm = if authenticated { self.config.auth_rpm } else { self.config.anon_rpm };
        let mut buckets = self.buckets.lock().await;
        buckets.entry(key).or_insert_with(|| Bucket::new(capacity_rpm)).try_consume()
    }
}

pub async fn middleware(
    State(state): State<crate::state::AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let (key, authenticated) = match subject_from_bearer(&state, &request) {
        Some(sub) => (format!("sub:{sub}"), true),
        None => (format!("ip:{}", addr.ip()), false),
    };

    match state.rate_limiter.check(key, authenticated).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}

/// Extract and verify the bearer token's subject, if present and valid.
/// An expired or malformed token is treated as anonymous, not rejected —
/// rate limiting is advisory here; the upstream service does real auth.
fn subject_from_bearer(state: &crate::state::AppState, request: &Request) -> Option<i64> {
    let header = request.headers().get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let now = chrono::Utc::now().timestamp();
    datecore::jwt::verify(token, &state.jwt_secret, now).ok().map(|claims| claims.sub)
}
