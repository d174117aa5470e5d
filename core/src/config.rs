//! Process-wide configuration (`spec.md` §6.4).
//!
//! Every binary calls [`load_env`] once at startup, then builds its own
//! small `Config` struct out of the shared pieces here
//! ([`DbConfig`], [`JwtConfig`]) plus whatever is specific to that
//! service. Values come from the environment; a `.env` file is loaded
//! first if present, the way the teacher's CLI binaries do via
//! `dotenvy`, but real environment variables always win.

use std::env;
use std::time::Duration;

/// Load a `.env` file if present. Safe to call from every binary; a
/// missing file is not an error.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

fn env_var(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Database connection and pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Connection string, required.
    pub url: String,
    /// Minimum pool size, default 5.
    pub pool_min: u32,
    /// Maximum pool size, default 20.
    pub pool_max: u32,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Per-statement timeout enforced via `SET statement_timeout`.
    pub statement_timeout: Duration,
}

impl DbConfig {
    /// Load from `DB_URL`, `DB_POOL_MIN`, `DB_POOL_MAX`.
    ///
    /// # Errors
    ///
    /// Returns an error if `DB_URL` is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            url: env_var("DB_URL")?,
            pool_min: env_parse_or("DB_POOL_MIN", 5),
            pool_max: env_parse_or("DB_POOL_MAX", 20),
            idle_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(5),
        })
    }
}

/// Bearer token signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA-256 signing secret, required.
    pub secret: String,
    /// Token lifetime, default 3600s.
    pub ttl: Duration,
}

impl JwtConfig {
    /// Load from `JWT_SECRET`, `TOKEN_TTL_SECONDS`.
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            secret: env_var("JWT_SECRET")?,
            ttl: Duration::from_secs(env_parse_or("TOKEN_TTL_SECONDS", 3600)),
        })
    }
}

/// Telegram `initData` verification configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token used to derive the HMAC key (§4.2 step 3).
    pub bot_token: String,
    /// Maximum age of `auth_date` before rejection, default 86400s.
    pub init_data_max_age: Duration,
}

impl TelegramConfig {
    /// Load from `TELEGRAM_BOT_TOKEN`, `INITDATA_MAX_AGE_SECONDS`.
    ///
    /// # Errors
    ///
    /// Returns an error if `TELEGRAM_BOT_TOKEN` is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bot_token: env_var("TELEGRAM_BOT_TOKEN")?,
            init_data_max_age: Duration::from_secs(env_parse_or("INITDATA_MAX_AGE_SECONDS", 86400)),
        })
    }
}

/// CORS configuration shared by the gateway.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Configured origin, or `*` for wildcard.
    pub webapp_domain: String,
}

impl CorsConfig {
    /// Load from `WEBAPP_DOMAIN` (default `*`).
    pub fn from_env() -> Self {
        Self {
            webapp_domain: env_var_or("WEBAPP_DOMAIN", "*"),
        }
    }
}

/// Rate limit defaults shared by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests per minute for anonymous callers, default 100.
    pub anon_rpm: u32,
    /// Requests per minute for authenticated callers, default 1000.
    pub auth_rpm: u32,
}

impl RateLimitConfig {
    /// Load from `RATE_LIMIT_ANON_RPM`, `RATE_LIMIT_AUTH_RPM`.
    pub fn from_env() -> Self {
        Self {
            anon_rpm: env_parse_or("RATE_LIMIT_ANON_RPM", 100),
            auth_rpm: env_parse_or("RATE_LIMIT_AUTH_RPM", 1000),
        }
    }
}

/// Resolve the URL of a named upstream service from `GATEWAY_UPSTREAM_<NAME>`.
///
/// # Errors
///
/// Returns an error if the variable is unset.
pub fn upstream_url(name: &str) -> anyhow::Result<String> {
    env_var(&format!("GATEWAY_UPSTREAM_{}", name.to_uppercase()))
}

/// Photo visibility cutoff, default 0.7.
pub fn nsfw_threshold() -> f64 {
    env_parse_or("NSFW_THRESHOLD", 0.7)
}

/// Notification event queue connection string.
///
/// # Errors
///
/// Returns an error if `QUEUE_URL` is unset.
pub fn queue_url() -> anyhow::Result<String> {
    env_var("QUEUE_URL")
}

/// The TCP port a service binds to, read from `PORT` (per-service default
/// supplied by the caller).
pub fn bind_port(default: u16) -> u16 {
    env_parse_or("PORT", default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_or_falls_back_on_missing() {
        // SAFETY-equivalent: no unsafe; just reading an env var that should
        // not be set in the test harness.
        assert_eq!(env_parse_or::<u32>("DOES_NOT_EXIST_XYZ", 42), 42);
    }
}
