use std::collections::BTreeMap;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::sign::request_signature;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_SIGNATURE: &str = "X-Signature";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_SDK_VERSION: &str = "X-SDK-Version";
pub const HEADER_PLATFORM: &str = "X-Platform";
pub const HEADER_RESPONSE_SIGNATURE: &str = "X-Response-Signature";

/// Builds the deterministic header map for one signed request attempt.
///
/// Client-identity headers are attached unconditionally; the bearer
/// credential is attached for every operation except initialize, where no
/// session exists yet.
pub fn build_signed_headers(
    config: &ApiConfig,
    method: &str,
    path: &str,
    body_len: u64,
    bearer: Option<&str>,
    timestamp_ms: i64,
) -> Result<BTreeMap<String, String>, ApiError> {
    if config.api_key.trim().is_empty() {
        return Err(ApiError::MissingApiKey);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_SDK_VERSION.to_owned(),
        config.sdk_version.trim().to_owned(),
    );
    headers.insert(HEADER_PLATFORM.to_owned(), config.platform.trim().to_owned());
    headers.insert(
        HEADER_SIGNATURE.to_owned(),
        request_signature(method, path, timestamp_ms, body_len, &config.api_key),
    );
    headers.insert(HEADER_TIMESTAMP.to_owned(), timestamp_ms.to_string());

    if let Some(token) = bearer {
        if token.trim().is_empty() {
            return Err(ApiError::MissingSessionToken);
        }
        headers.insert(
            HEADER_AUTHORIZATION.to_owned(),
            format!("Bearer {}", token.trim()),
        );
    }

    Ok(headers)
}
