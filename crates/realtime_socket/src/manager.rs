//! Connection manager task and its caller-facing handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::backoff::reconnect_delay;
use crate::events::{parse_frame, RealtimeEvent};
use crate::state::ConnectionState;
use crate::transport::{SocketConnection, SocketTransport};

/// Reconnection policy for the realtime channel.
#[derive(Debug, Clone, Copy)]
pub struct RealtimeConfig {
    /// Consecutive reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Backoff unit; the delay before attempt `n` is `base * n`, capped.
    pub base_reconnect_delay: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            base_reconnect_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect { session_id: String },
    Disconnect,
}

/// Steering handle for the manager task.
///
/// Cheap to clone; all clones drive the same connection. Dropping every
/// handle shuts the task down.
#[derive(Debug, Clone)]
pub struct RealtimeHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl RealtimeHandle {
    /// Requests a connection for `session_id`.
    ///
    /// Idempotent while connected to the same session; a different session id
    /// replaces the active connection. During reconnect backoff this restarts
    /// the attempt cycle immediately.
    pub fn connect(&self, session_id: impl Into<String>) {
        let _ = self.commands.send(Command::Connect {
            session_id: session_id.into(),
        });
    }

    /// Tears the connection down and cancels any pending reconnect.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Latest committed connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel over state transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Spawns the manager task onto the current runtime.
///
/// Returns the steering handle and the event stream. Events are delivered to
/// whichever receiver holds the channel at delivery time; nothing is buffered
/// for late subscribers beyond the channel itself.
pub fn spawn(
    transport: Arc<dyn SocketTransport>,
    config: RealtimeConfig,
) -> (RealtimeHandle, mpsc::UnboundedReceiver<RealtimeEvent>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    let task = ManagerTask {
        transport,
        config,
        commands: command_rx,
        events: event_tx,
        state: state_tx,
    };
    tokio::spawn(task.run());

    (
        RealtimeHandle {
            commands: command_tx,
            state: state_rx,
        },
        event_rx,
    )
}

/// Why an active session ended.
enum SessionEnd {
    /// Caller asked to disconnect, or the last handle was dropped.
    Stopped,
    /// Caller asked for a different session.
    Replaced(String),
    /// Transport failed or the peer closed; reconnection may follow.
    Lost(String),
}

enum Backoff {
    Elapsed,
    Stopped,
    Replaced(String),
}

struct ManagerTask {
    transport: Arc<dyn SocketTransport>,
    config: RealtimeConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<RealtimeEvent>,
    state: watch::Sender<ConnectionState>,
}

impl ManagerTask {
    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Disconnect => {}
                Command::Connect { session_id } => {
                    // Each run_session call is one serialized transition
                    // cycle; a replacement session chains into the next.
                    let mut next = Some(session_id);
                    while let Some(session_id) = next.take() {
                        next = self.run_session(session_id).await;
                    }
                }
            }
        }
    }

    /// Connects and drives one session until disconnect, replacement, or
    /// reconnect exhaustion. Returns the replacement session id, if any.
    async fn run_session(&mut self, session_id: String) -> Option<String> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                self.set_state(ConnectionState::Reconnecting(attempt));
                self.emit(RealtimeEvent::Reconnecting { attempt });
                let delay = reconnect_delay(self.config.base_reconnect_delay, attempt);
                match self.wait_backoff(delay).await {
                    Backoff::Elapsed => {}
                    Backoff::Stopped => {
                        self.finish_disconnected();
                        return None;
                    }
                    Backoff::Replaced(next) => return Some(next),
                }
            }

            self.set_state(ConnectionState::Connecting);
            match self.transport.dial(&session_id).await {
                Ok(connection) => {
                    self.set_state(ConnectionState::Connected);
                    self.emit(RealtimeEvent::Connected {
                        session_id: session_id.clone(),
                    });
                    attempt = 0;

                    match self.drive(connection, &session_id).await {
                        SessionEnd::Stopped => {
                            self.finish_disconnected();
                            return None;
                        }
                        SessionEnd::Replaced(next) => return Some(next),
                        SessionEnd::Lost(message) => {
                            tracing::warn!(%message, "realtime connection lost");
                            self.emit(RealtimeEvent::ConnectionError { message });
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, attempt, "realtime dial failed");
                    self.emit(RealtimeEvent::ConnectionError {
                        message: error.to_string(),
                    });
                }
            }

            attempt += 1;
            if attempt > self.config.max_reconnect_attempts {
                self.emit(RealtimeEvent::ReconnectExhausted {
                    attempts: self.config.max_reconnect_attempts,
                });
                self.finish_disconnected();
                return None;
            }
        }
    }

    /// Pumps frames and commands for an established connection.
    async fn drive(
        &mut self,
        mut connection: Box<dyn SocketConnection>,
        session_id: &str,
    ) -> SessionEnd {
        let Self {
            commands, events, ..
        } = self;

        loop {
            tokio::select! {
                frame = connection.next_frame() => match frame {
                    Some(Ok(text)) => match parse_frame(&text) {
                        Ok(Some(event)) => {
                            let _ = events.send(event);
                        }
                        Ok(None) => {}
                        Err(message) => {
                            // Bad frames are reported, never fatal.
                            tracing::warn!(%message, "undecodable realtime frame");
                            let _ = events.send(RealtimeEvent::ParseError { message });
                        }
                    },
                    Some(Err(error)) => {
                        connection.close().await;
                        return SessionEnd::Lost(error.to_string());
                    }
                    None => return SessionEnd::Lost("connection closed by peer".to_owned()),
                },
                command = commands.recv() => match command {
                    Some(Command::Disconnect) | None => {
                        connection.close().await;
                        return SessionEnd::Stopped;
                    }
                    Some(Command::Connect { session_id: requested }) => {
                        if requested == session_id {
                            continue;
                        }
                        connection.close().await;
                        return SessionEnd::Replaced(requested);
                    }
                },
            }
        }
    }

    /// Sleeps out a reconnect delay while staying responsive to commands.
    async fn wait_backoff(&mut self, delay: Duration) -> Backoff {
        tokio::select! {
            () = tokio::time::sleep(delay) => Backoff::Elapsed,
            command = self.commands.recv() => match command {
                Some(Command::Disconnect) | None => Backoff::Stopped,
                Some(Command::Connect { session_id }) => Backoff::Replaced(session_id),
            },
        }
    }

    fn emit(&self, event: RealtimeEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::debug!(%state, "realtime state");
        self.state.send_replace(state);
    }

    fn finish_disconnected(&self) {
        self.set_state(ConnectionState::Disconnected);
        self.emit(RealtimeEvent::Disconnected);
    }
}
