use datecore::auth::JwtSecretProvider;
use datecore::config::JwtConfig;
use datecore::repo::Repos;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub jwt: JwtConfig,
}

impl JwtSecretProvider for AppState {
    fn jwt_secret(&self) -> &str {
        &self.jwt.secret
    }
}
