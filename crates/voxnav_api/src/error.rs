use std::fmt;

use reqwest::StatusCode;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum ApiError {
    MissingApiKey,
    MissingSessionToken,
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    Serde(JsonError),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    MissingResponseSignature,
    InvalidContentType(String),
    StaleResponseTimestamp {
        skew_ms: i64,
    },
    EmptyData(&'static str),
    Cancelled,
}

impl ApiError {
    /// True for response-integrity violations, which are terminal and never
    /// retried.
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Self::MissingResponseSignature
                | Self::InvalidContentType(_)
                | Self::StaleResponseTimestamp { .. }
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::MissingSessionToken => write!(f, "session token is required"),
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::Serde(error) => write!(f, "serialization error: {error}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(
                    f,
                    "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})"
                )
            }
            Self::MissingResponseSignature => write!(f, "response is missing X-Response-Signature"),
            Self::InvalidContentType(value) => {
                write!(f, "response has non-JSON content type: {value}")
            }
            Self::StaleResponseTimestamp { skew_ms } => {
                write!(f, "response timestamp skew of {skew_ms}ms exceeds the allowed window")
            }
            Self::EmptyData(operation) => write!(f, "empty {operation} response data"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for ApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

/// Extracts a human-readable message from an error response body.
///
/// The backend wraps errors in the standard envelope; plain-text bodies and
/// empty bodies fall back to the body itself or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorEnvelope {
        message: Option<String>,
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.message.filter(|message| !message.is_empty()) {
            return message;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
