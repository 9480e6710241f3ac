use serde::{Deserialize, Serialize};

/// Standard response envelope wrapping every backend payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Body of `POST /initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub api_key: String,
    pub app_package: String,
    pub sdk_version: String,
    pub timestamp: i64,
    pub signature: String,
}

/// Payload of a successful initialize response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeData {
    pub session_id: String,
    /// Epoch-millisecond expiry; absent when the backend issues
    /// non-expiring sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Screen descriptor transmitted to the backend for voice matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPayload {
    pub screen_id: String,
    pub screen_name: String,
    pub description: String,
    pub deep_link: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// Body of `POST /register-screens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterScreensRequest {
    pub screens: Vec<ScreenPayload>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterScreensData {
    pub registered_count: u32,
}

/// Screen match produced by the backend for a processed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationData {
    pub screen_id: String,
    pub screen_name: String,
    pub deep_link: String,
    pub confidence: f32,
}

/// Payload of a successful submit-audio response.
///
/// Depending on backend mode this carries either a `conversation_id` handle
/// (results arrive later over the realtime channel) or the inline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAudioData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationData>,
}
