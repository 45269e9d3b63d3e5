//! `bhesignature` request signing.
//!
//! The signature is a three-link HMAC-SHA-256 chain. Each link is keyed by
//! the raw digest of the previous one; the first is keyed by the token key.
//!
//! | Link | Key              | Message                       |
//! |------|------------------|-------------------------------|
//! | 1    | token key        | `method + path` (no delimiter) |
//! | 2    | link 1 digest    | first 13 chars of `RequestDate` |
//! | 3    | link 2 digest    | exact body bytes (or nothing) |
//!
//! The base64 of link 3 is the `Signature` header. Only the date and hour
//! of the timestamp are signed, so a signature stays valid for the rest of
//! the wall-clock hour it was made in.

use base64::Engine;
use chrono::{Local, SecondsFormat};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::auth::Credentials;

type HmacSha256 = Hmac<Sha256>;

// ── Constants ───────────────────────────────────────────────────────

pub const USER_AGENT: &str = concat!("bhmigrate/", env!("CARGO_PKG_VERSION"));
pub const SIGNATURE_SCHEME: &str = "bhesignature";
pub const HEADER_REQUEST_DATE: &str = "RequestDate";
pub const HEADER_SIGNATURE: &str = "Signature";

/// `YYYY-MM-DDTHH`: date plus hour.
const DATE_WINDOW_LEN: usize = 13;

// ── Signing ─────────────────────────────────────────────────────────

/// Compute the base64 `Signature` header value for one request.
///
/// `path` is the path exactly as requested, leading slash included.
/// `body` must be the same bytes that go on the wire. An absent body and an
/// empty body sign identically.
pub fn sign(
    method: &str,
    path: &str,
    timestamp: &str,
    body: Option<&[u8]>,
    token_key: &[u8],
) -> String {
    let operation_key = digest(token_key, &[method.as_bytes(), path.as_bytes()]);
    let date_key = digest(&operation_key, &[date_window(timestamp)]);
    let signature = digest(&date_key, &[body.unwrap_or_default()]);

    base64::engine::general_purpose::STANDARD.encode(signature)
}

fn digest(key: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().to_vec()
}

fn date_window(timestamp: &str) -> &[u8] {
    let bytes = timestamp.as_bytes();
    &bytes[..bytes.len().min(DATE_WINDOW_LEN)]
}

/// Current local time with UTC offset, e.g. `2024-01-01T10:00:00.123456+02:00`.
///
/// This string is both signed and sent as `RequestDate`.
pub fn request_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

// ── Headers ─────────────────────────────────────────────────────────

/// The auth header values for one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `bhesignature <token_id>`
    pub authorization: String,
    /// Sent verbatim; byte-identical to the timestamp that was signed.
    pub request_date: String,
    pub signature: String,
    pub user_agent: &'static str,
}

impl SignedHeaders {
    pub fn new(
        credentials: &Credentials,
        method: &str,
        path: &str,
        timestamp: String,
        body: Option<&[u8]>,
    ) -> Self {
        let signature = sign(method, path, &timestamp, body, credentials.token_key());
        Self {
            authorization: format!("{} {}", SIGNATURE_SCHEME, credentials.token_id()),
            request_date: timestamp,
            signature,
            user_agent: USER_AGENT,
        }
    }
}
