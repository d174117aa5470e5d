//! Auth Service entry point (`spec.md` §4.2).
//!
//! Validates Telegram WebApp `initData`, mints and verifies bearer
//! tokens. Stateless aside from the `users` upsert on first auth.

mod handlers;
mod state;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use datecore::config::{self, DbConfig, JwtConfig, TelegramConfig};
use datecore::db;
use datecore::repo::Repos;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("auth-service");
    config::load_env();

    let db_config = DbConfig::from_env().context("loading DB_URL")?;
    let jwt_config = JwtConfig::from_env().context("loading JWT_SECRET")?;
    let telegram_config = TelegramConfig::from_env().context("loading TELEGRAM_BOT_TOKEN")?;

    let pool = db::connect_and_migrate(&db_config)
        .await
        .context("connecting to database")?;

    let state = AppState {
        repos: Repos::new(pool),
        jwt: jwt_config,
        telegram: telegram_config,
    };

    let app = Router::new()
        .route("/auth/validate", post(handlers::validate))
        .route("/auth/verify", get(handlers::verify))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = config::bind_port(8081);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "auth-service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("auth-service shutting down");
}
