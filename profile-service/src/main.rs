//! Profile Service entry point (`spec.md` §4.3).

mod handlers;
mod state;
mod validation;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use datecore::config::{self, DbConfig, JwtConfig};
use datecore::db;
use datecore::repo::Repos;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("profile-service");
    config::load_env();

    let db_config = DbConfig::from_env().context("loading DB_URL")?;
    let jwt_config = JwtConfig::from_env().context("loading JWT_SECRET")?;

    let pool = db::connect_and_migrate(&db_config)
        .await
        .context("connecting to database")?;

    let state = AppState {
        repos: Repos::new(pool),
        jwt: jwt_config,
    };

    let app = Router::new()
        .route("/profiles/check", get(handlers::check_exists))
        .route("/profiles/{user_id}", get(handlers::get_profile))
        .route("/profiles/{user_id}", patch(handlers::patch_profile))
        .route("/profiles", post(handlers::create_profile))
        .route(
            "/profiles/{user_id}/photos",
            get(handlers::list_photos).post(handlers::add_photo),
        )
        .route("/profiles/{user_id}/photos/{photo_id}", delete(handlers::delete_photo))
        .route(
            "/profiles/{user_id}/photos/{photo_id}/primary",
            post(handlers::set_primary_photo),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = config::bind_port(8082);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "profile-service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("profile-service shutting down");
}
