//! Notification Relay entry point (`spec.md` §4.6).
//!
//! Not part of the public gateway route table: this process only polls
//! the shared database and calls out to the Telegram Bot API. It still
//! exposes `/health` on its own port for container liveness probes, the
//! way every other service binary does.

mod bot_client;
mod relay;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tower_http::trace::TraceLayer;

use datecore::config::{self, DbConfig, TelegramConfig};
use datecore::db;
use datecore::repo::Repos;

use bot_client::BotClient;

#[tokio::main]
async fn main() -> Result<()> {
    datecore::logging::init("notification-relay");
    config::load_env();

    let db_config = DbConfig::from_env().context("loading DB_URL")?;
    let telegram_config = TelegramConfig::from_env().context("loading TELEGRAM_BOT_TOKEN")?;

    let pool = db::connect_and_migrate(&db_config)
        .await
        .context("connecting to database")?;

    let repos = Repos::new(pool);
    let bot = BotClient::new(telegram_config.bot_token);

    tokio::spawn(relay::run(repos, bot));

    let app = Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    let port = config::bind_port(8085);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "notification-relay listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(json!({"status": "ok"}))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("notification-relay shutting down");
}
