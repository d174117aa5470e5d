//! Shared application state (`spec.md` §4.1).

use std::collections::HashMap;
use std::time::Duration;

use datecore::config::{self, JwtConfig, RateLimitConfig};

use crate::health::HealthTracker;
use crate::rate_limit::RateLimiter;
use crate::routes::Upstream;

/// Upstream names probed by [`crate::health::run_prober`] and reported by
/// `GET /health`. Must match [`Upstream::env_name`] for every variant.
pub const PROBED_UPSTREAMS: &[&str] = &["auth", "profile", "discovery", "media", "chat"];

#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub upstream_base_urls: HashMap<&'static str, String>,
    pub health: HealthTracker,
    pub rate_limiter: RateLimiter,
    pub jwt_secret: String,
}

impl AppState {
    /// Build from the environment, resolving every upstream's base URL
    /// eagerly so a misconfigured deployment fails at startup rather than
    /// on the first proxied request.
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` or any `GATEWAY_UPSTREAM_<NAME>`
    /// variable is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig::from_env()?;
        let rate_limit = RateLimitConfig::from_env();

        let upstreams = [Upstream::Auth, Upstream::Profile, Upstream::Discovery, Upstream::Media, Upstream::Chat];
        let mut upstream_base_urls = HashMap::with_capacity(upstreams.len());
        for upstream in upstreams {
            let name = upstream.env_name();
            upstream_base_urls.insert(name, config::upstream_url(name)?);
        }

        let http = reqwest::Client::builder().connect_timeout(Duration::from_secs(2)).build()?;

        Ok(Self {
            http,
            upstream_base_urls,
            health: HealthTracker::new(),
            rate_limiter: RateLimiter::new(rate_limit),
            jwt_secret: jwt.secret,
        })
    }

    pub fn base_url_for(&self, upstream: Upstream) -> Option<&str> {
        self.upstream_base_urls.get(upstream.env_name()).map(String::as_str)
    }
}
