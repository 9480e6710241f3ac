//! Realtime event channel for the voxnav backend.
//!
//! One manager task owns a single session-keyed websocket connection and its
//! state machine. Callers steer it through a [`RealtimeHandle`] and observe it
//! through a state watch plus an event stream; the task serializes every
//! transition, so no two transitions are ever in flight at once.
//!
//! Transport loss triggers automatic reconnection with a linear-capped
//! backoff. Exhausting the attempt budget is terminal: the manager parks in
//! `Disconnected` until the caller asks to connect again.

pub mod backoff;
pub mod error;
pub mod events;
pub mod manager;
pub mod state;
pub mod transport;

pub use error::RealtimeError;
pub use events::{ConversationResult, ProcessedResult, RealtimeEvent, ScreenMatch};
pub use manager::{spawn, RealtimeConfig, RealtimeHandle};
pub use state::ConnectionState;
pub use transport::{SocketConnection, SocketTransport, WebSocketTransport};
