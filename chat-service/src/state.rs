use datecore::auth::JwtSecretProvider;
use datecore::config::JwtConfig;
use datecore::idempotency::IdempotencyCache;
use datecore::repo::Repos;

use crate::session_map::SessionMap;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub jwt: JwtConfig,
    pub sessions: SessionMap,
    pub idempotency: std::sync::Arc<IdempotencyCache>,
}

impl JwtSecretProvider for AppState {
    fn jwt_secret(&self) -> &str {
        &self.jwt.secret
    }
}
