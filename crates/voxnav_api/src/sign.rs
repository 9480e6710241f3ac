//! Request signature derivation.
//!
//! Signatures are a collision-resistant hash over request metadata
//! concatenated with the shared secret: tamper evidence without encrypting
//! the payload. All functions here are pure.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

/// Signature over `{method}{path}{timestamp}{body_len}` plus the secret,
/// carried in the `X-Signature` header of every signed request.
#[must_use]
pub fn request_signature(
    method: &str,
    path: &str,
    timestamp_ms: i64,
    body_len: u64,
    secret: &str,
) -> String {
    sha256_base64(&format!("{method}{path}{timestamp_ms}{body_len}{secret}"))
}

/// Signature over `{api_key}{timestamp}`, embedded in the initialize body to
/// prove possession of the key at a specific instant.
#[must_use]
pub fn credential_signature(api_key: &str, timestamp_ms: i64) -> String {
    sha256_base64(&format!("{api_key}{timestamp_ms}"))
}

fn sha256_base64(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    general_purpose::STANDARD.encode(digest)
}
