//! WebSocket session manager (`spec.md` §4.5).
//!
//! Grounded on the split-socket / mpsc-fan-out / `tokio::select!`-race
//! pattern used for realtime gateway connections elsewhere in the corpus:
//! the socket is split into send and receive halves, each driven by its
//! own task, and whichever finishes first (client disconnect, protocol
//! error, backpressure overflow) aborts the other.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use datecore::auth::JwtSecretProvider;
use datecore::models::{ContentType, MAX_CONTENT_BYTES};
use datecore::ApiError;

use crate::authz;
use crate::protocol::{InboundMessage, OutboundMessage, TypingState};
use crate::state::AppState;

/// Server ping cadence (`spec.md` §4.5 heartbeat).
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// How long without a pong before the session is considered dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);
/// How often the watchdog checks the pong deadline.
const WATCHDOG_TICK: Duration = Duration::from_secs(5);
/// Flood-control window for inbound frames (`spec.md` §4.5 close code `4429`).
const FLOOD_WINDOW: Duration = Duration::from_secs(10);
/// Frames allowed per [`FLOOD_WINDOW`] before a connection is closed.
const FLOOD_LIMIT: u32 = 30;

/// Sliding-window counter tracking one connection's inbound frame rate.
struct FloodGuard {
    window_start: Instant,
    count: u32,
}

impl FloodGuard {
    fn new() -> Self {
        Self { window_start: Instant::now(), count: 0 }
    }

    /// Returns `true` once the caller has exceeded [`FLOOD_LIMIT`] frames
    /// within [`FLOOD_WINDOW`].
    fn record(&mut self) -> bool {
        if self.window_start.elapsed() > FLOOD_WINDOW {
            self.window_start = Instant::now();
            self.count = 0;
        }
        self.count += 1;
        self.count > FLOOD_LIMIT
    }
}

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query.token, state))
}

async fn handle_socket(socket: WebSocket, token: String, state: AppState) {
    let now = chrono::Utc::now().timestamp();
    let claims = match datecore::jwt::verify(&token, state.jwt_secret(), now) {
        Ok(c) => c,
        Err(_) => {
            close_immediately(socket, 4401, "invalid or expired token").await;
            return;
        }
    };
    let user_id = claims.sub;

    match state.repos.users.is_blocked(user_id).await {
        Ok(false) => {}
        Ok(true) => {
            close_immediately(socket, 4403, "account is blocked").await;
            return;
        }
        Err(err) => {
            tracing::error!(%user_id, error = %err, "failed to check block status on handshake");
            close_immediately(socket, 1011, "internal error").await;
            return;
        }
    }

    let (session_id, self_tx, mut outbound_rx, overflow) = state.sessions.register(user_id).await;
    let (mut sender, mut receiver) = socket.split();
    let last_pong = Arc::new(Mutex::new(Instant::now()));
    let flooded = Arc::new(tokio::sync::Notify::new());

    let send_flooded = flooded.clone();
    let send_last_pong = last_pong.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        let mut watchdog = tokio::time::interval(WATCHDOG_TICK);
        ping_interval.tick().await;
        watchdog.tick().await;

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(msg) => {
                            let Ok(text) = serde_json::to_string(&msg) else { continue };
                            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if sender.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                _ = watchdog.tick() => {
                    let elapsed = send_last_pong.lock().expect("last_pong lock poisoned").elapsed();
                    if elapsed > PONG_TIMEOUT {
                        let _ = sender.send(close_frame(1000, "heartbeat timeout")).await;
                        break;
                    }
                }
                () = overflow.notified() => {
                    let _ = sender.send(close_frame(1011, "backpressure")).await;
                    break;
                }
                () = send_flooded.notified() => {
                    let _ = sender.send(close_frame(4429, "rate limited")).await;
                    break;
                }
            }
        }
    });

    let recv_last_pong = last_pong.clone();
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut flood_guard = FloodGuard::new();
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    if flood_guard.record() {
                        flooded.notify_one();
                        break;
                    }
                    handle_inbound(&recv_state, user_id, session_id, &self_tx, &text).await;
                }
                Ok(WsMessage::Pong(_)) => {
                    *recv_last_pong.lock().expect("last_pong lock poisoned") = Instant::now();
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%user_id, error = %err, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.sessions.deregister(user_id, session_id).await;
}

async fn handle_inbound(
    state: &AppState,
    user_id: i64,
    session_id: Uuid,
    self_tx: &tokio::sync::mpsc::Sender<OutboundMessage>,
    text: &str,
) {
    let inbound: InboundMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(_) => {
            let _ = self_tx
                .try_send(OutboundMessage::error("bad_request", "unrecognized frame"));
            return;
        }
    };

    match inbound {
        InboundMessage::Ping => {
            let _ = self_tx.try_send(OutboundMessage::Pong);
        }
        InboundMessage::MessageSend {
            conversation_id,
            text,
            idempotency_key,
        } => {
            handle_message_send(state, user_id, session_id, self_tx, conversation_id, text, idempotency_key).await;
        }
        InboundMessage::ReadSet {
            conversation_id,
            up_to_message_id,
        } => {
            handle_read_set(state, user_id, self_tx, conversation_id, up_to_message_id).await;
        }
        InboundMessage::TypingSet {
            conversation_id,
            state: typing_state,
        } => {
            handle_typing_set(state, user_id, self_tx, conversation_id, typing_state).await;
        }
    }
}

async fn handle_message_send(
    state: &AppState,
    user_id: i64,
    session_id: Uuid,
    self_tx: &tokio::sync::mpsc::Sender<OutboundMessage>,
    conversation_id: i64,
    text: String,
    idempotency_key: Option<String>,
) {
    if text.is_empty() || text.len() > MAX_CONTENT_BYTES {
        let _ = self_tx.try_send(OutboundMessage::error("validation_error", "message length out of bounds"));
        return;
    }

    let recipient_id = match authz::authorize_send(state, user_id, conversation_id).await {
        Ok((_conversation, recipient_id)) => recipient_id,
        Err(ApiError::NotFound) => {
            let _ = self_tx.try_send(OutboundMessage::error("not_found", "conversation does not exist"));
            return;
        }
        Err(ApiError::Forbidden) => {
            let _ = self_tx.try_send(OutboundMessage::error("forbidden", "not permitted to send here"));
            return;
        }
        Err(ApiError::BlockedUser) => {
            let _ = self_tx.try_send(OutboundMessage::error("forbidden", "conversation is blocked"));
            return;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to authorize message send");
            let _ = self_tx.try_send(OutboundMessage::error("send_failed", "internal error"));
            return;
        }
    };

    let dedup_key = idempotency_key
        .map(|key| format!("chat:{conversation_id}:{key}"))
        .unwrap_or_else(|| format!("chat:{conversation_id}:{}", Uuid::new_v4()));

    let message = match state
        .repos
        .messages
        .insert_and_enqueue(
            &state.repos.outbox,
            conversation_id,
            user_id,
            recipient_id,
            &text,
            ContentType::Text,
            &dedup_key,
        )
        .await
    {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(error = %err, "failed to persist message");
            let _ = self_tx.try_send(OutboundMessage::error("send_failed", "could not send message"));
            return;
        }
    };

    let event = OutboundMessage::MessageCreated {
        conversation_id,
        message,
    };
    state.sessions.send_to_user(recipient_id, None, &event).await;
    state.sessions.send_to_user(user_id, Some(session_id), &event).await;
}

async fn handle_read_set(
    state: &AppState,
    user_id: i64,
    self_tx: &tokio::sync::mpsc::Sender<OutboundMessage>,
    conversation_id: i64,
    up_to_message_id: i64,
) {
    let conversation = match state.repos.conversations.find_by_id(conversation_id).await {
        Ok(Some(c)) if c.has_participant(user_id) => c,
        Ok(_) => {
            let _ = self_tx.try_send(OutboundMessage::error("forbidden", "not a participant"));
            return;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load conversation for read.set");
            return;
        }
    };

    if let Err(err) = state
        .repos
        .read_cursors
        .advance(conversation_id, user_id, up_to_message_id)
        .await
    {
        tracing::error!(error = %err, "failed to advance read cursor");
        return;
    }

    let event = OutboundMessage::MessageRead {
        conversation_id,
        user_id,
        up_to_message_id,
    };
    if let Some(counterparty) = conversation.counterparty(user_id) {
        state.sessions.send_to_user(counterparty, None, &event).await;
    }
}

async fn handle_typing_set(
    state: &AppState,
    user_id: i64,
    self_tx: &tokio::sync::mpsc::Sender<OutboundMessage>,
    conversation_id: i64,
    typing_state: TypingState,
) {
    let conversation = match state.repos.conversations.find_by_id(conversation_id).await {
        Ok(Some(c)) if c.has_participant(user_id) => c,
        Ok(_) => {
            let _ = self_tx.try_send(OutboundMessage::error("forbidden", "not a participant"));
            return;
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load conversation for typing.set");
            return;
        }
    };

    let event = OutboundMessage::ConversationTyping {
        conversation_id,
        user_id,
        state: typing_state,
    };
    if let Some(counterparty) = conversation.counterparty(user_id) {
        state.sessions.send_to_user(counterparty, None, &event).await;
    }
}

fn close_frame(code: u16, reason: &'static str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn close_immediately(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket.send(close_frame(code, reason)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_guard_allows_up_to_the_limit() {
        let mut guard = FloodGuard::new();
        for _ in 0..FLOOD_LIMIT {
            assert!(!guard.record());
        }
        assert!(guard.record());
    }
}
