// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

mod account_events;

pub use account_events::{
    AccountEvent, AccountEventData, AccountProfile, EVENT_ACCOUNT_CREATED,
    EVENT_ACCOUNT_DELETED, EVENT_ACCOUNT_UPDATED,
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing webhook header: {0}")]
    MissingHeader(&'static str),

    #[error("webhook timestamp is malformed or outside tolerance")]
    StaleTimestamp,

    #[error("webhook signature mismatch")]
    BadSignature,

    #[error("malformed webhook payload: {0}")]
    BadPayload(String),
}

/// Verify a webhook delivery before trusting its payload.
///
/// The provider signs `{message_id}.{timestamp}.{body}` with HMAC-SHA256
/// and sends one or more space-separated `v1,<base64>` entries in the
/// signature header. The timestamp must be within `tolerance_secs` of now.
/// Comparison is constant-time via the MAC verification itself.
pub fn verify_signature(
    secret: &str,
    message_id: &str,
    timestamp: &str,
    signature_header: &str,
    payload: &[u8],
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::StaleTimestamp)?;
    if (Utc::now().timestamp() - ts).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::BadSignature)?;
    mac.update(message_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    for candidate in signature_header.split_whitespace() {
        let encoded = candidate.strip_prefix("v1,").unwrap_or(candidate);
        if let Ok(bytes) = BASE64.decode(encoded) {
            if mac.clone().verify_slice(&bytes).is_ok() {
                return Ok(());
            }
        }
    }

    Err(WebhookError::BadSignature)
}

/// Parse a verified webhook body into an account lifecycle event.
pub fn parse_event(payload: &[u8]) -> Result<AccountEvent, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::BadPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(message_id: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("hmac key");
        mac.update(message_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_is_accepted() {
        let ts = Utc::now().timestamp().to_string();
        let payload = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let header = sign("msg_1", &ts, payload);

        assert!(verify_signature(SECRET, "msg_1", &ts, &header, payload, 300).is_ok());
    }

    #[test]
    fn extra_header_entries_are_tolerated() {
        let ts = Utc::now().timestamp().to_string();
        let payload = b"{}";
        let header = format!("v1,bm90LXRoZS1zaWc= {}", sign("msg_2", &ts, payload));

        assert!(verify_signature(SECRET, "msg_2", &ts, &header, payload, 300).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let ts = Utc::now().timestamp().to_string();
        let header = sign("msg_3", &ts, b"original");

        let err = verify_signature(SECRET, "msg_3", &ts, &header, b"tampered", 300);
        assert!(matches!(err, Err(WebhookError::BadSignature)));
    }

    #[test]
    fn wrong_message_id_is_rejected() {
        let ts = Utc::now().timestamp().to_string();
        let header = sign("msg_4", &ts, b"{}");

        let err = verify_signature(SECRET, "msg_other", &ts, &header, b"{}", 300);
        assert!(matches!(err, Err(WebhookError::BadSignature)));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let old = (Utc::now().timestamp() - 3600).to_string();
        let header = sign("msg_5", &old, b"{}");

        let err = verify_signature(SECRET, "msg_5", &old, &header, b"{}", 300);
        assert!(matches!(err, Err(WebhookError::StaleTimestamp)));
    }
}
