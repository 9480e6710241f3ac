use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("invalid realtime endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("websocket dial failed: {0}")]
    Dial(String),

    #[error("websocket transport failed: {0}")]
    Transport(String),
}
