//! Telegram WebApp `initData` verification (`spec.md` §4.2 steps 1-4).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// The literal key-derivation constant from the Telegram WebApp spec.
const WEBAPP_DATA_CONSTANT: &[u8] = b"WebAppData";

/// Parsed, verified `initData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    /// Telegram user id, parsed out of the `user` field's JSON.
    pub telegram_id: i64,
    /// Telegram username, if present in the `user` field's JSON.
    pub username: Option<String>,
    /// `auth_date`, Unix seconds.
    pub auth_date: i64,
}

/// Why `initData` verification failed.
#[derive(Debug, thiserror::Error)]
pub enum InitDataError {
    /// Not a parseable `application/x-www-form-urlencoded` string, or
    /// missing a required field (`hash`, `auth_date`, or `user`).
    #[error("malformed init data")]
    Malformed,
    /// HMAC did not match the supplied `hash`.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// `auth_date` is older than the configured max age.
    #[error("expired init data")]
    Expired,
}

/// Verify a raw `initData` string against the bot token, per `spec.md`
/// §4.2 steps 1-4.
///
/// # Errors
///
/// See [`InitDataError`].
pub fn verify(
    raw: &str,
    bot_token: &str,
    now: i64,
    max_age_seconds: i64,
) -> Result<VerifiedInitData, InitDataError> {
    let pairs = parse_form_urlencoded(raw);

    let hash = pairs.get("hash").ok_or(InitDataError::Malformed)?.clone();

    let mut sorted: BTreeMap<&str, &str> = BTreeMap::new();
    for (k, v) in &pairs {
        if k != "hash" {
            sorted.insert(k.as_str(), v.as_str());
        }
    }
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    // key = HMAC-SHA-256("WebAppData", bot_token)
    let mut key_mac =
        HmacSha256::new_from_slice(WEBAPP_DATA_CONSTANT).map_err(|_| InitDataError::Malformed)?;
    key_mac.update(bot_token.as_bytes());
    let derived_key = key_mac.finalize().into_bytes();

    // expected = HMAC-SHA-256(key, data_check_string), lowercase hex
    let mut mac =
        HmacSha256::new_from_slice(&derived_key).map_err(|_| InitDataError::Malformed)?;
    mac.update(data_check_string.as_bytes());
    let expected_hex = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(expected_hex.as_bytes(), hash.as_bytes()) {
        return Err(InitDataError::SignatureMismatch);
    }

    let auth_date: i64 = pairs
        .get("auth_date")
        .and_then(|v| v.parse().ok())
        .ok_or(InitDataError::Malformed)?;

    if now - auth_date > max_age_seconds {
        return Err(InitDataError::Expired);
    }

    let user_json = pairs.get("user").ok_or(InitDataError::Malformed)?;
    let user: serde_json::Value =
        serde_json::from_str(user_json).map_err(|_| InitDataError::Malformed)?;
    let telegram_id = user
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or(InitDataError::Malformed)?;
    let username = user
        .get("username")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(VerifiedInitData {
        telegram_id,
        username,
        auth_date,
    })
}

/// Constant-time comparison (`spec.md` §4.2 step 4).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn parse_form_urlencoded(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((url_decode(key), url_decode(value)))
        })
        .collect()
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(bot_token: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: BTreeMap<&str, &str> = fields.iter().cloned().collect();
        sorted.remove("hash");
        let data_check_string = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut key_mac = HmacSha256::new_from_slice(WEBAPP_DATA_CONSTANT).unwrap();
        key_mac.update(bot_token.as_bytes());
        let derived_key = key_mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&derived_key).unwrap();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn verifies_a_well_formed_payload() {
        let bot_token = "123456:ABC";
        let user = r#"{"id":42,"username":"alice"}"#;
        let auth_date = "1000";
        let hash = sign(bot_token, &[("auth_date", auth_date), ("user", user)]);
        let raw = format!("auth_date={auth_date}&user={}&hash={hash}", urlencode(user));

        let verified = verify(&raw, bot_token, 1060, 86400).expect("should verify");
        assert_eq!(verified.telegram_id, 42);
        assert_eq!(verified.username.as_deref(), Some("alice"));
        assert_eq!(verified.auth_date, 1000);
    }

    #[test]
    fn rejects_tampered_payload() {
        let bot_token = "123456:ABC";
        let user = r#"{"id":42}"#;
        let hash = sign(bot_token, &[("auth_date", "1000"), ("user", user)]);
        let raw = format!("auth_date=9999&user={}&hash={hash}", urlencode(user));
        let err = verify(&raw, bot_token, 1060, 86400).unwrap_err();
        assert!(matches!(err, InitDataError::SignatureMismatch));
    }

    #[test]
    fn rejects_stale_auth_date() {
        let bot_token = "123456:ABC";
        let user = r#"{"id":42}"#;
        let hash = sign(bot_token, &[("auth_date", "1000"), ("user", user)]);
        let raw = format!("auth_date=1000&user={}&hash={hash}", urlencode(user));
        let err = verify(&raw, bot_token, 1000 + 90_000, 86400).unwrap_err();
        assert!(matches!(err, InitDataError::Expired));
    }

    fn urlencode(s: &str) -> String {
        s.chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
                _ => format!("%{:02X}", c as u32),
            })
            .collect()
    }
}
