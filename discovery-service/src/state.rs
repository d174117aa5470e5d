use datecore::auth::JwtSecretProvider;
use datecore::config::JwtConfig;
use datecore::idempotency::IdempotencyCache;
use datecore::repo::Repos;

use crate::cache::ProfileCache;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub jwt: JwtConfig,
    pub profile_cache: std::sync::Arc<ProfileCache>,
    pub idempotency: std::sync::Arc<IdempotencyCache>,
}

impl JwtSecretProvider for AppState {
    fn jwt_secret(&self) -> &str {
        &self.jwt.secret
    }
}
