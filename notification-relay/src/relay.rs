//! Outbox poll loop (`spec.md` §4.6).
//!
//! Claims undelivered `outbox_events` rows whose backoff has elapsed,
//! resolves each recipient's Telegram id, and hands the event to
//! [`BotClient`]. Transient failures are rescheduled per the backoff
//! table; permanent ones are logged and left as a dropped row (`attempts`
//! reaches [`datecore::repo::MAX_DELIVERY_ATTEMPTS`]).

use std::time::Duration;

use datecore::models::OutboxEvent;
use datecore::repo::Repos;

use crate::bot_client::{BotClient, BotError};

/// How often the relay polls for claimable events.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Rows claimed per poll cycle.
const BATCH_SIZE: i64 = 50;

pub async fn run(repos: Repos, bot: BotClient) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        interval.tick().await;

        let batch = match repos.outbox.claim_batch(BATCH_SIZE).await {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!(error = %err, "failed to claim outbox batch");
                continue;
            }
        };

        for event in batch {
            deliver_one(&repos, &bot, event).await;
        }
    }
}

async fn deliver_one(repos: &Repos, bot: &BotClient, event: OutboxEvent) {
    let recipient_id = match recipient_id_for(&event) {
        Some(id) => id,
        None => {
            tracing::error!(event_id = event.id, kind = %event.kind, "event payload missing recipient id, dropping");
            let _ = repos.outbox.mark_permanently_failed(event.id, "missing recipient id in payload").await;
            return;
        }
    };

    let telegram_id = match repos.users.find_by_id(recipient_id).await {
        Ok(Some(user)) => user.telegram_id,
        Ok(None) => {
            tracing::warn!(event_id = event.id, recipient_id, "recipient no longer exists, dropping event");
            let _ = repos.outbox.mark_delivered(event.id).await;
            return;
        }
        Err(err) => {
            tracing::error!(event_id = event.id, error = %err, "failed to look up recipient, will retry");
            let _ = repos.outbox.mark_failed(event.id, &err.to_string(), event.attempts + 1).await;
            return;
        }
    };

    match bot.notify(&event.kind, telegram_id, &event.payload).await {
        Ok(()) => {
            if let Err(err) = repos.outbox.mark_delivered(event.id).await {
                tracing::error!(event_id = event.id, error = %err, "failed to mark event delivered");
            }
        }
        Err(BotError::Transient(reason)) => {
            let attempts_after = event.attempts + 1;
            tracing::warn!(event_id = event.id, attempts = attempts_after, reason, "transient delivery failure, will retry");
            if let Err(err) = repos.outbox.mark_failed(event.id, &reason, attempts_after).await {
                tracing::error!(event_id = event.id, error = %err, "failed to record delivery failure");
            }
        }
        Err(BotError::Permanent(reason)) => {
            tracing::error!(event_id = event.id, reason, "bot API rejected event, dropping");
            if let Err(err) = repos.outbox.mark_permanently_failed(event.id, &reason).await {
                tracing::error!(event_id = event.id, error = %err, "failed to record permanent failure");
            }
        }
    }
}

fn recipient_id_for(event: &OutboxEvent) -> Option<i64> {
    event.payload.get("recipient_id").and_then(serde_json::Value::as_i64)
}
