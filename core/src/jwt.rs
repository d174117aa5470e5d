//! Bearer token minting and verification (`spec.md` §4.2).
//!
//! A hand-rolled HS256 JWS rather than a full JWT framework, so the
//! implementation reads directly against the spec: header
//! `{"alg":"HS256","typ":"JWT"}`, claims `{sub, tg, iat, exp}`,
//! signature `HMAC-SHA-256(secret, header.payload)`, all base64url
//! without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Internal surrogate user id.
    pub sub: i64,
    /// External Telegram id.
    pub tg: i64,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// Errors from token minting/verification.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token is not well-formed compact JWS (three dot-separated parts).
    #[error("malformed token")]
    Malformed,
    /// Signature did not verify.
    #[error("bad signature")]
    BadSignature,
    /// `exp` is in the past.
    #[error("token expired")]
    Expired,
}

/// Mint a new token with the given claims, signed with `secret`.
///
/// # Errors
///
/// Returns an error only if the HMAC key is rejected (never happens for
/// `Hmac<Sha256>`, which accepts keys of any length), surfaced as
/// `TokenError::Malformed` to keep the return type infallible-looking at
/// call sites that have already validated the secret at startup.
pub fn mint(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON);
    let payload_json = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::Malformed)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify a token's signature and expiry, returning its claims.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] if the token is not three
/// dot-separated base64url segments, [`TokenError::BadSignature`] if the
/// HMAC does not match, and [`TokenError::Expired`] if `exp` has passed
/// (checked against `now`, supplied by the caller so this function has
/// no hidden clock dependency and is trivially testable).
pub fn verify(token: &str, secret: &str, now: i64) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let signing_input = format!("{header_b64}.{payload_b64}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::Malformed)?;
    mac.update(signing_input.as_bytes());

    let given_sig = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| TokenError::Malformed)?;
    mac.verify_slice(&given_sig).map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    if claims.exp <= now {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

/// Fraction of a token's lifetime remaining, in `[0.0, 1.0]`, used by
/// `/auth/refresh`'s "last 10% of lifetime" rule (§4.2).
pub fn remaining_fraction(claims: &Claims, now: i64) -> f64 {
    let total = (claims.exp - claims.iat).max(1) as f64;
    let remaining = (claims.exp - now).max(0) as f64;
    remaining / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: i64, exp: i64) -> Claims {
        Claims {
            sub: 42,
            tg: 1001,
            iat,
            exp,
        }
    }

    #[test]
    fn round_trips() {
        let token = mint(&claims(1000, 2000), "secret").expect("mint");
        let verified = verify(&token, "secret", 1500).expect("verify");
        assert_eq!(verified, claims(1000, 2000));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = mint(&claims(1000, 2000), "secret").expect("mint");
        let err = verify(&token, "other-secret", 1500).unwrap_err();
        assert!(matches!(err, TokenError::BadSignature));
    }

    #[test]
    fn rejects_expired() {
        let token = mint(&claims(1000, 2000), "secret").expect("mint");
        let err = verify(&token, "secret", 2001).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn rejects_malformed() {
        let err = verify("not-a-token", "secret", 0).unwrap_err();
        assert!(matches!(err, TokenError::Malformed));
    }

    #[test]
    fn refresh_collapses_in_final_tenth() {
        let c = claims(0, 1000);
        assert!(remaining_fraction(&c, 950) < 0.1);
        assert!(remaining_fraction(&c, 500) > 0.1);
    }
}
