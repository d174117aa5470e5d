//! End-to-end exercise of the auth handshake pieces `auth-service` chains
//! together (`spec.md` §4.2): verify `initData`, mint a bearer token off
//! the verified Telegram id, verify that token back, and check the
//! refresh-eligibility window. Each step is unit-tested on its own inside
//! `core::telegram_init_data`/`core::jwt`; this exercises them as the
//! sequence a real `/auth/verify` request drives.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

use datecore::jwt::{self, Claims};
use datecore::telegram_init_data::{self, InitDataError};

type HmacSha256 = Hmac<Sha256>;

fn sign_init_data(bot_token: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: BTreeMap<&str, &str> = fields.iter().copied().collect();
    sorted.remove("hash");
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut key_mac = HmacSha256::new_from_slice(b"WebAppData").unwrap();
    key_mac.update(bot_token.as_bytes());
    let derived_key = key_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&derived_key).unwrap();
    mac.update(data_check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            _ => format!("%{:02X}", c as u32),
        })
        .collect()
}

#[test]
fn full_handshake_mints_a_token_carrying_the_verified_telegram_id() {
    let bot_token = "555:DEF";
    let user = r#"{"id":9001,"username":"nadia"}"#;
    let hash = sign_init_data(bot_token, &[("auth_date", "1_000_000"), ("user", user)]);
    let raw = format!("auth_date=1_000_000&user={}&hash={hash}", urlencode(user));

    // Step 1-4: verify initData.
    let verified = telegram_init_data::verify(&raw, bot_token, 1_000_060, 86_400).expect("valid initData");
    assert_eq!(verified.telegram_id, 9001);

    // Step 5: mint a bearer token, surrogate id assigned by auth-service
    // at user-lookup time (stood in here by a fixed value).
    let claims = Claims {
        sub: 42,
        tg: verified.telegram_id,
        iat: 1_000_060,
        exp: 1_000_060 + 3600,
    };
    let token = jwt::mint(&claims, "jwt-secret").expect("mint token");

    // A client replaying the token against /auth/validate gets the same claims back.
    let round_tripped = jwt::verify(&token, "jwt-secret", 1_000_100).expect("verify token");
    assert_eq!(round_tripped, claims);

    // Freshly minted: nowhere near the refresh window yet.
    assert!(jwt::remaining_fraction(&round_tripped, 1_000_100) > 0.1);

    // Near expiry: now eligible for refresh.
    assert!(jwt::remaining_fraction(&round_tripped, claims.exp - 100) < 0.1);
}

#[test]
fn a_token_signed_with_one_secret_never_verifies_with_another() {
    let claims = Claims { sub: 1, tg: 2, iat: 0, exp: 1000 };
    let token = jwt::mint(&claims, "secret-a").expect("mint token");
    let err = jwt::verify(&token, "secret-b", 500).unwrap_err();
    assert!(matches!(err, jwt::TokenError::BadSignature));
}

#[test]
fn tampering_with_init_data_after_signing_breaks_verification() {
    let bot_token = "555:DEF";
    let user = r#"{"id":9001}"#;
    let hash = sign_init_data(bot_token, &[("auth_date", "1000"), ("user", user)]);
    // Attacker bumps their own id after the hash was computed.
    let forged_user = r#"{"id":1}"#;
    let raw = format!("auth_date=1000&user={}&hash={hash}", urlencode(forged_user));

    let err = telegram_init_data::verify(&raw, bot_token, 1060, 86_400).unwrap_err();
    assert!(matches!(err, InitDataError::SignatureMismatch));
}
