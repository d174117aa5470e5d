//! Chat Service entry point (`spec.md` §4.5).
//!
//! Conversation/message history over HTTP, realtime delivery over
//! WebSocket, both backed by the same persistence and session map.

mod authz;
mod handlers;
mod protocol;
mod session_map;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use datecore::config::{self, DbConfig, JwtConfig};
use datecore::db;
use datecore::idempotency::IdempotencyCache;
use datecore::repo::Repos;

use session_map::SessionMap;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("chat-service");
    config::load_env();

    let db_config = DbConfig::from_env().context("loading DB_URL")?;
    let jwt_config = JwtConfig::from_env().context("loading JWT_SECRET")?;

    let pool = db::connect_and_migrate(&db_config)
        .await
        .context("connecting to database")?;

    let state = AppState {
        repos: Repos::new(pool),
        jwt: jwt_config,
        sessions: SessionMap::new(),
        idempotency: Arc::new(IdempotencyCache::new()),
    };

    let app = Router::new()
        .route("/chat/ws", get(ws::chat_ws_handler))
        .route("/chat/conversations", get(handlers::list_conversations))
        .route("/chat/conversations/{id}/messages", get(handlers::list_messages))
        .route("/chat/messages", post(handlers::send_message))
        .route("/chat/messages/{id}/read", put(handlers::mark_read))
        .route("/chat/conversations/{id}/block", post(handlers::block_conversation))
        .route("/chat/conversations/{id}/report", post(handlers::report_conversation))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = config::bind_port(8084);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("chat-service shutting down");
}
