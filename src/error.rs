use session_store::SessionStoreError;
use thiserror::Error;
use voxnav_api::ApiError;

/// Caller-facing error taxonomy.
///
/// Retryable transport failures are recovered inside the pipeline and never
/// reach the caller; everything here is a typed, terminal outcome of one
/// operation.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No session exists; call `initialize` first.
    #[error("SDK is not initialized")]
    NotInitialized,

    /// Retry-exhausted or non-retryable transport/HTTP failure.
    #[error("network failure: {last_error}")]
    NetworkFailure { last_error: String },

    /// Response-integrity or app-identity violation. Never retried.
    #[error("security failure: {reason}")]
    SecurityFailure { reason: String },

    /// The local rate window is full; the attempt was not counted.
    #[error("rate limit exceeded")]
    RateLimited,

    /// The stored session reached its expiry; re-initialize to continue.
    #[error("session expired")]
    SessionExpired,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("session persistence failed: {0}")]
    Persistence(#[from] SessionStoreError),
}

impl From<ApiError> for SdkError {
    fn from(error: ApiError) -> Self {
        if error.is_security() {
            return Self::SecurityFailure {
                reason: error.to_string(),
            };
        }
        match error {
            ApiError::MissingSessionToken => Self::NotInitialized,
            other => Self::NetworkFailure {
                last_error: other.to_string(),
            },
        }
    }
}
