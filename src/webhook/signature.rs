//! Webhook request signature verification.
//!
//! Validates that an inbound request genuinely originated from the chat
//! platform: HMAC-SHA256 over `v0:{timestamp}:{body}` keyed with the
//! shared signing secret, compared in constant time, with a replay window
//! on the timestamp header. Pure validation — no side effects, no retries.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature (`v0=<hex>`).
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Header carrying the request timestamp (unix seconds).
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Maximum accepted clock skew between the timestamp header and now.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Verify a webhook request against the shared signing secret.
///
/// # Errors
///
/// Returns `AppError::Signature` when the timestamp header is absent or
/// non-numeric, outside the replay window, the signature header is absent
/// or malformed, or the computed signature differs.
pub fn verify(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<()> {
    verify_at(secret, timestamp, signature, body, Utc::now().timestamp())
}

/// [`verify`] with an injectable clock for tests.
///
/// # Errors
///
/// See [`verify`].
pub fn verify_at(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<()> {
    let timestamp = timestamp
        .ok_or_else(|| AppError::Signature("missing timestamp header".into()))?
        .trim();
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::Signature(format!("non-numeric timestamp: {timestamp}")))?;

    if (now - ts).abs() > REPLAY_WINDOW_SECS {
        return Err(AppError::Signature(format!(
            "timestamp outside replay window: {ts}"
        )));
    }

    let signature = signature
        .ok_or_else(|| AppError::Signature("missing signature header".into()))?
        .trim();
    let digest_hex = signature
        .strip_prefix("v0=")
        .ok_or_else(|| AppError::Signature("signature must use v0=<hex> format".into()))?;
    let supplied = decode_hex(digest_hex)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| AppError::Signature(format!("invalid signing secret: {err}")))?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    // verify_slice performs the comparison in constant time.
    mac.verify_slice(&supplied)
        .map_err(|_| AppError::Signature("signature mismatch".into()))
}

/// Compute the expected signature header value for a request.
///
/// Used by tests to construct valid requests.
#[must_use]
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        // HMAC-SHA256 accepts keys of any length; this branch is unreachable.
        return String::new();
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    format!("v0={hex}")
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(AppError::Signature("malformed signature digest".into()));
    }
    let mut bytes = Vec::with_capacity(raw.len() / 2);
    let mut index = 0;
    while index < raw.len() {
        let chunk = raw
            .get(index..index + 2)
            .ok_or_else(|| AppError::Signature("malformed signature digest".into()))?;
        let byte = u8::from_str_radix(chunk, 16)
            .map_err(|_| AppError::Signature(format!("invalid hex byte: {chunk}")))?;
        bytes.push(byte);
        index += 2;
    }
    Ok(bytes)
}
