//! WebSocket wire protocol (`spec.md` §4.5, §6.3).
//!
//! Every frame is UTF-8 JSON, discriminated by a `type` field. Inbound
//! and outbound message sets are disjoint enums rather than one shared
//! type, since a client never receives an inbound variant or vice versa.

use datecore::models::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TypingState {
    On,
    Off,
}

/// Frames a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "message.send")]
    MessageSend {
        conversation_id: i64,
        text: String,
        idempotency_key: Option<String>,
    },
    #[serde(rename = "read.set")]
    ReadSet {
        conversation_id: i64,
        up_to_message_id: i64,
    },
    #[serde(rename = "typing.set")]
    TypingSet {
        conversation_id: i64,
        state: TypingState,
    },
    #[serde(rename = "ping")]
    Ping,
}

/// Frames the server may send. `Clone` so [`crate::session_map::SessionMap`]
/// can fan one event out to several sessions without re-serializing per send.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "message.created")]
    MessageCreated { conversation_id: i64, message: Message },
    #[serde(rename = "message.read")]
    MessageRead {
        conversation_id: i64,
        user_id: i64,
        up_to_message_id: i64,
    },
    #[serde(rename = "conversation.typing")]
    ConversationTyping {
        conversation_id: i64,
        user_id: i64,
        state: TypingState,
    },
    #[serde(rename = "conversation.blocked")]
    ConversationBlocked { conversation_id: i64, by_user_id: i64 },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl OutboundMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
