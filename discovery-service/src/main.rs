//! Discovery Service entry point (`spec.md` §4.4).
//!
//! Candidate selection, like/pass interaction semantics, match
//! creation, and favorites — the hardest subsystem in the platform.

mod cache;
mod handlers;
mod ranking;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use datecore::config::{self, DbConfig, JwtConfig};
use datecore::db;
use datecore::idempotency::IdempotencyCache;
use datecore::repo::Repos;

use cache::ProfileCache;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("discovery-service");
    config::load_env();

    let db_config = DbConfig::from_env().context("loading DB_URL")?;
    let jwt_config = JwtConfig::from_env().context("loading JWT_SECRET")?;

    let pool = db::connect_and_migrate(&db_config)
        .await
        .context("connecting to database")?;

    let state = AppState {
        repos: Repos::new(pool),
        jwt: jwt_config,
        profile_cache: Arc::new(ProfileCache::new()),
        idempotency: Arc::new(IdempotencyCache::new()),
    };

    let app = Router::new()
        .route("/discovery/candidates", get(handlers::list_candidates))
        .route("/discovery/like", post(handlers::like))
        .route("/discovery/pass", post(handlers::pass))
        .route("/discovery/matches", get(handlers::list_matches))
        .route(
            "/discovery/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route("/discovery/favorites/{target_id}", delete(handlers::remove_favorite))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = config::bind_port(8083);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "discovery-service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("discovery-service shutting down");
}
