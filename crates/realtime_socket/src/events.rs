//! Inbound frame decoding and the caller-facing event type.
//!
//! Frames arrive as `{"event": <name>, "data": {...}}`. Unknown event names
//! are skipped rather than reported; malformed payloads for known events are
//! surfaced as parse errors without tearing down the connection.

use serde::Deserialize;

/// Events delivered to the realtime subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// The backend acknowledged the connection for this session.
    Connected { session_id: String },
    /// The channel is down and no reconnect is pending.
    Disconnected,
    /// A reconnect attempt is scheduled or in progress.
    Reconnecting { attempt: u32 },
    /// The reconnect budget is spent; explicit `connect` is required to resume.
    ReconnectExhausted { attempts: u32 },
    TranscriptionCompleted {
        conversation_id: String,
        transcription: String,
    },
    ConversationProcessed(ConversationResult),
    /// A known event arrived with an undecodable payload.
    ParseError { message: String },
    /// A transport-level failure, reported before any reconnect handling.
    ConnectionError { message: String },
}

/// Full processing result pushed once a conversation completes server-side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversationResult {
    pub conversation_id: String,
    pub status: String,
    pub result: ProcessedResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessedResult {
    pub transcription: String,
    pub reply_text: String,
    #[serde(default)]
    pub reply_audio_url: Option<String>,
    #[serde(default)]
    pub navigation: Option<ScreenMatch>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScreenMatch {
    pub screen_id: String,
    pub screen_name: String,
    pub deep_link: String,
    pub confidence: f32,
}

#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct ConnectedData {
    session_id: String,
}

#[derive(Deserialize)]
struct TranscriptionData {
    conversation_id: String,
    transcription: String,
}

/// Decodes one text frame into an event.
///
/// `Ok(None)` means the frame was well-formed but carries no event for the
/// subscriber (an unrecognized event name). `Err` carries a description of a
/// malformed frame or payload.
pub fn parse_frame(text: &str) -> Result<Option<RealtimeEvent>, String> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|error| format!("malformed frame: {error}"))?;

    match frame.event.as_str() {
        "connected" => {
            let data: ConnectedData = decode(frame.data, "connected")?;
            Ok(Some(RealtimeEvent::Connected {
                session_id: data.session_id,
            }))
        }
        "transcription_completed" => {
            let data: TranscriptionData = decode(frame.data, "transcription_completed")?;
            Ok(Some(RealtimeEvent::TranscriptionCompleted {
                conversation_id: data.conversation_id,
                transcription: data.transcription,
            }))
        }
        "conversation_processed" => {
            let result: ConversationResult = decode(frame.data, "conversation_processed")?;
            Ok(Some(RealtimeEvent::ConversationProcessed(result)))
        }
        _ => Ok(None),
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    data: serde_json::Value,
    event: &str,
) -> Result<T, String> {
    serde_json::from_value(data).map_err(|error| format!("malformed {event} payload: {error}"))
}
