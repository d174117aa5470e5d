//! HTTP client for the external Telegram Bot API (`spec.md` §4.6: "calls
//! the external Bot with a structured payload"). The relay resolves this
//! to the Telegram Bot API's `sendMessage` method keyed by
//! `TELEGRAM_BOT_TOKEN`, the same secret already required for `initData`
//! verification — there is no separate bot-service endpoint in the
//! configuration contract (`spec.md` §6.4).

use serde_json::Value;
use std::time::Duration;

/// Bot API call deadline (`spec.md` §5: "Bot API call 5 s with retry").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Connection refused, timed out, or otherwise didn't complete —
    /// worth retrying.
    #[error("transient bot API failure: {0}")]
    Transient(String),
    /// Bot API rejected the request outright (4xx) — retrying will not help.
    #[error("bot API rejected request: {0}")]
    Permanent(String),
}

#[derive(Clone)]
pub struct BotClient {
    http: reqwest::Client,
    bot_token: String,
}

impl BotClient {
    pub fn new(bot_token: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("building reqwest client");
        Self { http, bot_token }
    }

    /// Push a notification to `recipient_telegram_id` describing `kind`/`payload`.
    pub async fn notify(&self, kind: &str, recipient_telegram_id: i64, payload: &Value) -> Result<(), BotError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let text = render_text(kind, payload);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": recipient_telegram_id,
                "text": text,
            }))
            .send()
            .await
            .map_err(|err| BotError::Transient(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(BotError::Transient(format!("{status}: {body}")))
        } else {
            Err(BotError::Permanent(format!("{status}: {body}")))
        }
    }
}

/// Render a human-readable push notification for an outbox event kind.
/// Deliberately does not echo message content — the Bot can fetch details
/// through the authenticated API if the user opens the Mini App.
fn render_text(kind: &str, payload: &Value) -> String {
    match kind {
        "chat.message.sent" => "You have a new message.".to_owned(),
        "discovery.match.created" => {
            let match_id = payload.get("match_id").and_then(Value::as_i64);
            match match_id {
                Some(id) => format!("You have a new match! (#{id})"),
                None => "You have a new match!".to_owned(),
            }
        }
        other => format!("New event: {other}"),
    }
}
