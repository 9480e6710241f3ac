//! Websocket transport behind a dial/read seam.
//!
//! The manager depends only on the two traits here, so tests can script
//! connections without a listening server.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::RealtimeError;

/// One established realtime connection.
#[async_trait]
pub trait SocketConnection: Send {
    /// Next text frame, or `None` once the peer closes the stream.
    async fn next_frame(&mut self) -> Option<Result<String, RealtimeError>>;

    /// Initiates a graceful close. Close failures are ignored; the connection
    /// is abandoned either way.
    async fn close(&mut self);
}

/// Dials realtime connections keyed by session.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn dial(&self, session_id: &str) -> Result<Box<dyn SocketConnection>, RealtimeError>;
}

/// Production transport over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    endpoint: String,
}

impl WebSocketTransport {
    /// `endpoint` is the ws/wss URL without credentials; the session id is
    /// appended as a query parameter at dial time.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn dial(&self, session_id: &str) -> Result<Box<dyn SocketConnection>, RealtimeError> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(RealtimeError::InvalidEndpoint(self.endpoint.clone()));
        }
        let url = format!("{}?session_id={session_id}", self.endpoint);
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|error| RealtimeError::Dial(error.to_string()))?;
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketConnection for WebSocketConnection {
    async fn next_frame(&mut self) -> Option<Result<String, RealtimeError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Control frames and binary payloads carry no domain events.
                Ok(_) => continue,
                Err(error) => return Some(Err(RealtimeError::Transport(error.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
