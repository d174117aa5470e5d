use datecore::config::{JwtConfig, TelegramConfig};
use datecore::repo::Repos;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repos,
    pub jwt: JwtConfig,
    pub telegram: TelegramConfig,
}
