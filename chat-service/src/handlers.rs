//! HTTP surface of the Chat Service (`spec.md` §4.5): conversation and
//! message history, plus the non-realtime send/read/block/report
//! operations. The WebSocket surface lives in [`crate::ws`].

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use datecore::auth::AuthUser;
use datecore::models::{ContentType, Message};
use datecore::repo::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use datecore::ApiError;

use crate::authz;
use crate::protocol::OutboundMessage;
use crate::state::AppState;

const DEFAULT_CONVERSATION_PAGE: usize = 20;
const MAX_CONVERSATION_PAGE: usize = 100;
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    pub user_id: i64,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub counterparty_id: i64,
    pub counterparty_name: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub unread_count: i64,
    pub blocked: bool,
}

/// `GET /chat/conversations?user_id=&limit=&cursor=` (`spec.md` §4.5).
///
/// `ConversationRepo::list_for_user` has no native cursor; pagination is
/// applied in-process over its `updated_at DESC` ordering, the same way
/// discovery's match listing paginates over a repo call with no LIMIT/OFFSET
/// of its own.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<Value>, ApiError> {
    if user.user_id != query.user_id {
        return Err(ApiError::Forbidden);
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_CONVERSATION_PAGE)
        .clamp(1, MAX_CONVERSATION_PAGE);

    let conversations = state.repos.conversations.list_for_user(query.user_id).await?;

    let after_cursor = conversations
        .into_iter()
        .skip_while(|c| {
            query
                .cursor
                .as_deref()
                .is_some_and(|cursor| !is_after_conversation_cursor(c.id, c.updated_at, cursor))
        })
        .take(limit + 1)
        .collect::<Vec<_>>();

    let has_more = after_cursor.len() > limit;
    let page = &after_cursor[..after_cursor.len().min(limit)];

    let mut summaries = Vec::with_capacity(page.len());
    for conversation in page {
        let Some(counterparty_id) = conversation.counterparty(query.user_id) else {
            continue;
        };
        let counterparty_name = state
            .repos
            .profiles
            .find_by_user_id(counterparty_id)
            .await?
            .map(|p| p.name);
        let unread_count = state
            .repos
            .read_cursors
            .unread_count(conversation.id, query.user_id)
            .await?;

        summaries.push(ConversationSummary {
            id: conversation.id,
            counterparty_id,
            counterparty_name,
            updated_at: conversation.updated_at,
            unread_count,
            blocked: conversation.is_blocked(),
        });
    }

    let next_cursor = if has_more {
        page.last().map(|c| encode_conversation_cursor(c.id, c.updated_at))
    } else {
        None
    };

    Ok(Json(json!({ "conversations": summaries, "next_cursor": next_cursor })))
}

fn encode_conversation_cursor(id: i64, updated_at: chrono::DateTime<chrono::Utc>) -> String {
    format!("{}:{id}", updated_at.timestamp_micros())
}

/// Whether `(id, updated_at)` sorts strictly after `cursor` under the
/// listing's `updated_at DESC, id DESC` order.
fn is_after_conversation_cursor(id: i64, updated_at: chrono::DateTime<chrono::Utc>, cursor: &str) -> bool {
    let Some((ts_str, id_str)) = cursor.split_once(':') else {
        return true;
    };
    let (Ok(cursor_ts), Ok(cursor_id)) = (ts_str.parse::<i64>(), id_str.parse::<i64>()) else {
        return true;
    };
    (updated_at.timestamp_micros(), id) < (cursor_ts, cursor_id)
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub before: Option<i64>,
}

/// `GET /chat/conversations/{id}/messages?limit=&before=` (`spec.md` §4.5).
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<i64>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    let conversation = state
        .repos
        .conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !conversation.has_participant(user.user_id) {
        return Err(ApiError::Forbidden);
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let mut messages = state
        .repos
        .messages
        .list_page(conversation_id, query.before, limit)
        .await?;
    // The repo returns newest-first for efficient keyset pagination;
    // clients expect chronological order (`spec.md` §4.5).
    messages.reverse();

    Ok(Json(json!({ "messages": messages })))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: i64,
    pub content: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message_id: i64,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

/// `POST /chat/messages` (`spec.md` §4.5): the HTTP fallback to send,
/// used by clients without an open WebSocket session.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if let Some(cached) = replay_idempotent(&state, &headers).await? {
        return Ok(Json(cached));
    }

    if body.content.is_empty() || body.content.len() > datecore::models::MAX_CONTENT_BYTES {
        return Err(ApiError::Validation(vec![datecore::error::FieldError::new(
            "content",
            "must be 1-4096 bytes",
        )]));
    }

    let content_type = match body.content_type.as_deref() {
        Some(raw) => raw
            .parse::<ContentType>()
            .map_err(|_| ApiError::Validation(vec![datecore::error::FieldError::new("content_type", "unknown content type")]))?,
        None => ContentType::Text,
    };

    let (_conversation, recipient_id) =
        authz::authorize_send(&state, user.user_id, body.conversation_id).await?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let dedup_key = idempotency_key
        .map(|key| format!("chat:{}:{key}", body.conversation_id))
        .unwrap_or_else(|| format!("chat:{}:{}", body.conversation_id, uuid::Uuid::new_v4()));

    let message: Message = state
        .repos
        .messages
        .insert_and_enqueue(
            &state.repos.outbox,
            body.conversation_id,
            user.user_id,
            recipient_id,
            &body.content,
            content_type,
            &dedup_key,
        )
        .await?;

    let response = SendMessageResponse {
        message_id: message.id,
        sent_at: message.created_at,
    };

    state
        .sessions
        .send_to_user(
            recipient_id,
            None,
            &OutboundMessage::MessageCreated {
                conversation_id: body.conversation_id,
                message,
            },
        )
        .await;

    store_idempotent(&state, &headers, &response).await;
    Ok(Json(response))
}

/// `PUT /chat/messages/{id}/read` (`spec.md` §4.5).
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(message_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let message = state
        .repos
        .messages
        .find_by_id(message_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let conversation = state
        .repos
        .conversations
        .find_by_id(message.conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !conversation.has_participant(user.user_id) {
        return Err(ApiError::Forbidden);
    }

    let cursor = state
        .repos
        .read_cursors
        .advance(message.conversation_id, user.user_id, message_id)
        .await?;

    if let Some(counterparty) = conversation.counterparty(user.user_id) {
        state
            .sessions
            .send_to_user(
                counterparty,
                None,
                &OutboundMessage::MessageRead {
                    conversation_id: message.conversation_id,
                    user_id: user.user_id,
                    up_to_message_id: cursor.last_read_message_id,
                },
            )
            .await;
    }

    Ok(Json(json!({ "conversation_id": message.conversation_id, "last_read_message_id": cursor.last_read_message_id })))
}

/// `POST /chat/conversations/{id}/block` (`spec.md` §4.5).
pub async fn block_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let conversation = state
        .repos
        .conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !conversation.has_participant(user.user_id) {
        return Err(ApiError::Forbidden);
    }

    state.repos.conversations.set_blocked(conversation_id, user.user_id).await?;

    let event = OutboundMessage::ConversationBlocked {
        conversation_id,
        by_user_id: user.user_id,
    };
    state.sessions.send_to_user(conversation.user1_id, None, &event).await;
    state.sessions.send_to_user(conversation.user2_id, None, &event).await;

    Ok(Json(json!({ "conversation_id": conversation_id, "blocked_by": user.user_id })))
}

#[derive(Debug, Deserialize)]
pub struct ReportConversationRequest {
    #[serde(rename = "type")]
    pub category: String,
    pub reason: Option<String>,
}

/// `POST /chat/conversations/{id}/report` (`spec.md` §4.5): creates a
/// Report against the counterparty; does not block.
pub async fn report_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<i64>,
    Json(body): Json<ReportConversationRequest>,
) -> Result<Json<Value>, ApiError> {
    let conversation = state
        .repos
        .conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let Some(reported_id) = conversation.counterparty(user.user_id) else {
        return Err(ApiError::Forbidden);
    };

    let report = state
        .repos
        .reports
        .create(user.user_id, reported_id, &body.category, body.reason.as_deref())
        .await?;

    Ok(Json(serde_json::to_value(report).map_err(|e| ApiError::Internal(e.into()))?))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn replay_idempotent(state: &AppState, headers: &HeaderMap) -> Result<Option<SendMessageResponse>, ApiError> {
    let Some(key) = headers.get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };

    let Some((_status, body)) = state.idempotency.get(key).await else {
        return Ok(None);
    };

    let response = serde_json::from_slice(&body).map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Some(response))
}

async fn store_idempotent(state: &AppState, headers: &HeaderMap, response: &SendMessageResponse) {
    let Some(key) = headers.get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()) else {
        return;
    };

    if let Ok(body) = serde_json::to_vec(response) {
        state.idempotency.put(key.to_string(), 200, body).await;
    }
}
