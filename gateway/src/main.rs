//! Edge Gateway entry point (`spec.md` §4.1).
//!
//! The single public entry point into the platform: resolves each request
//! against the static route table, reverse-proxies HTTP and WebSocket
//! traffic to the right upstream, and applies CORS and rate limiting
//! uniformly so individual services don't each reimplement them.

mod cors;
mod health;
mod proxy;
mod rate_limit;
mod routes;
mod state;
mod ws_proxy;

use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use datecore::config::{self, CorsConfig};

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("gateway");
    config::load_env();

    let state = AppState::from_env()?;
    let cors_config = CorsConfig::from_env();

    tokio::spawn(health::run_prober(state.clone()));

    let app = Router::new()
        .route("/v1/chat/ws", get(ws_proxy::handle))
        .route("/health", get(health::handler))
        .fallback(proxy::handle)
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit::middleware))
        .layer(cors::layer(&cors_config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = config::bind_port(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("gateway shutting down");
}
