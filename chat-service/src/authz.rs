//! Shared authorization checks for sending a message, used by both the
//! WebSocket and HTTP-fallback send paths (`spec.md` §4.5 authorization
//! per operation).

use datecore::models::{AllowMessagesFrom, Conversation, Match};
use datecore::ApiError;

use crate::state::AppState;

/// Load a conversation and verify `user_id` may send into it right now:
/// must be a participant, and the conversation must not be blocked.
/// Returns the conversation and the counterparty's id.
pub async fn authorize_send(
    state: &AppState,
    user_id: i64,
    conversation_id: i64,
) -> Result<(Conversation, i64), ApiError> {
    let conversation = state
        .repos
        .conversations
        .find_by_id(conversation_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if !conversation.has_participant(user_id) {
        return Err(ApiError::Forbidden);
    }
    if conversation.is_blocked() {
        return Err(ApiError::BlockedUser);
    }

    let recipient_id = conversation.counterparty(user_id).ok_or(ApiError::Forbidden)?;
    if !recipient_allows_message(state, user_id, recipient_id).await? {
        return Err(ApiError::Forbidden);
    }

    Ok((conversation, recipient_id))
}

/// Whether `recipient_id` permits a message from `sender_id`, per their
/// `allow_messages_from` setting.
pub async fn recipient_allows_message(
    state: &AppState,
    sender_id: i64,
    recipient_id: i64,
) -> Result<bool, ApiError> {
    let Some(profile) = state.repos.profiles.find_by_user_id(recipient_id).await? else {
        return Ok(false);
    };

    match profile.allow_messages_from {
        AllowMessagesFrom::Anyone => Ok(true),
        AllowMessagesFrom::Matches => {
            let (lo, hi) = Match::canonical_pair(sender_id, recipient_id);
            Ok(state.repos.matches.find_between(lo, hi).await?.is_some())
        }
    }
}
