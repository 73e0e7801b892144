//! Slack request signing, the `v0:{timestamp}:{body}` HMAC-SHA256 scheme.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Requests older (or newer) than this are rejected to blunt replay.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const SIGNATURE_VERSION: &str = "v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request is missing signature headers")]
    MissingHeaders,
    #[error("request timestamp is not a number")]
    MalformedTimestamp,
    #[error("request timestamp is outside the allowed window")]
    StaleTimestamp,
    #[error("signature header is malformed")]
    MalformedSignature,
    #[error("signature does not match")]
    Mismatch,
}

/// Check a request signature against the signing secret.
///
/// `timestamp` and `provided` are the raw `X-Slack-Request-Timestamp` and
/// `X-Slack-Signature` header values; `now_unix` is injected so the replay
/// window is testable.
pub fn verify(
    signing_secret: &str,
    timestamp: &str,
    body: &str,
    provided: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let parsed: i64 = timestamp.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
    if (now_unix - parsed).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let encoded = provided
        .strip_prefix(&format!("{SIGNATURE_VERSION}="))
        .ok_or(SignatureError::MalformedSignature)?;
    let expected = decode_hex(encoded).ok_or(SignatureError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|_| SignatureError::Mismatch)?;
    mac.update(format!("{SIGNATURE_VERSION}:{timestamp}:{body}").as_bytes());
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Produce the signature Slack would send for this payload.
pub fn sign(signing_secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(format!("{SIGNATURE_VERSION}:{timestamp}:{body}").as_bytes());
    let digest = mac.finalize().into_bytes();
    format!("{SIGNATURE_VERSION}={}", encode_hex(&digest))
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(input.get(index..index + 2)?, 16).ok())
        .collect()
}
