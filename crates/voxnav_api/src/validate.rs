//! Success-response integrity checks.
//!
//! Runs only on success statuses; error responses skip validation so the
//! retry stage can classify them. Violations are terminal security failures
//! and are never retried.

use reqwest::header::{HeaderMap, CONTENT_TYPE};

use crate::error::ApiError;
use crate::headers::{HEADER_RESPONSE_SIGNATURE, HEADER_TIMESTAMP};

/// Maximum tolerated difference between the response timestamp and local
/// time, bounding replay and clock-skew exposure.
pub const MAX_RESPONSE_SKEW_MS: i64 = 5 * 60 * 1_000;

/// Validates the integrity headers of a success response.
pub fn validate_success_headers(headers: &HeaderMap, now_ms: i64) -> Result<(), ApiError> {
    if !headers.contains_key(HEADER_RESPONSE_SIGNATURE) {
        return Err(ApiError::MissingResponseSignature);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") {
        return Err(ApiError::InvalidContentType(content_type.to_owned()));
    }

    // A missing timestamp header skips the freshness check; a present but
    // unparseable one does too, matching the lenient backend contract.
    if let Some(timestamp) = headers
        .get(HEADER_TIMESTAMP)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
    {
        let skew_ms = (now_ms - timestamp).abs();
        if skew_ms > MAX_RESPONSE_SKEW_MS {
            return Err(ApiError::StaleResponseTimestamp { skew_ms });
        }
    }

    Ok(())
}
