use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use realtime_socket::{
    ConnectionState, RealtimeEvent, RealtimeHandle, SocketTransport, WebSocketTransport,
};
use security_guard::{AppIdentity, RateLimiter};
use session_store::{Session, SessionChange, SessionStore};
use tokio::sync::{mpsc, watch};
use voxnav_api::audio::resolve_reply_audio_url;
use voxnav_api::{ApiClient, CancellationSignal, ScreenPayload, SubmitAudioData};

use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::screens::ScreenRegistration;

/// Result of one audio submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitAudioOutcome {
    /// Accepted for asynchronous processing; the result arrives over the
    /// realtime channel under this conversation id.
    Queued { conversation_id: String },
    /// Processed inline; the full result is already here.
    Completed(SubmitAudioData),
}

/// One initialized SDK instance.
///
/// All state is owned by this handle. The realtime channel follows the
/// session automatically: replacing the session reconnects under the new
/// token, clearing it disconnects.
pub struct VoxnavSdk {
    api: ApiClient,
    sessions: Arc<SessionStore>,
    limiter: RateLimiter,
    realtime: RealtimeHandle,
    events: Mutex<Option<mpsc::UnboundedReceiver<RealtimeEvent>>>,
    screens: RwLock<Vec<ScreenRegistration>>,
    base_url: String,
}

impl VoxnavSdk {
    /// Validates credentials with the backend and returns a ready instance.
    ///
    /// Runs the app-identity check first when configured, then performs the
    /// initialize call, stores the issued session, and brings up the realtime
    /// channel keyed by it.
    pub async fn initialize(config: SdkConfig) -> Result<Self, SdkError> {
        config.validate()?;
        verify_identity(&config)?;

        let sessions = Arc::new(match &config.session_file {
            Some(path) => SessionStore::open(path)?,
            None => SessionStore::in_memory(),
        });

        let api = ApiClient::new(config.api_config()).map_err(SdkError::from)?;
        let data = api.initialize(None).await?;
        let session = sessions.set(data.session_id, data.expires_at).await?;
        tracing::info!(expires_at = ?session.expires_at_ms, "SDK initialized");

        let transport: Arc<dyn SocketTransport> =
            Arc::new(WebSocketTransport::new(config.realtime_endpoint()));
        let (realtime, events) = realtime_socket::spawn(transport, config.realtime_config());
        spawn_session_observer(sessions.subscribe(), realtime.clone());
        realtime.connect(&session.token);

        Ok(Self {
            api,
            sessions,
            limiter: RateLimiter::per_minute(config.rate_limit_per_minute as usize),
            realtime,
            events: Mutex::new(Some(events)),
            screens: RwLock::new(Vec::new()),
            base_url: config.base_url,
        })
    }

    /// Registers screens for voice matching. Returns the count the backend
    /// acknowledged.
    pub async fn register_screens(
        &self,
        screens: &[ScreenRegistration],
        cancellation: Option<&CancellationSignal>,
    ) -> Result<u32, SdkError> {
        let session = self.require_valid_session()?;
        self.admit()?;

        let payloads: Vec<ScreenPayload> = screens.iter().map(ScreenPayload::from).collect();
        let data = self
            .api
            .register_screens(&session.token, &payloads, cancellation)
            .await?;

        if let Ok(mut registry) = self.screens.write() {
            for screen in screens {
                match registry
                    .iter_mut()
                    .find(|known| known.screen_id == screen.screen_id)
                {
                    Some(known) => *known = screen.clone(),
                    None => registry.push(screen.clone()),
                }
            }
        }
        Ok(data.registered_count)
    }

    /// Screens successfully registered through this instance, latest
    /// registration winning per screen id.
    #[must_use]
    pub fn registered_screens(&self) -> Vec<ScreenRegistration> {
        self.screens
            .read()
            .map(|registry| registry.clone())
            .unwrap_or_default()
    }

    /// Submits one audio clip for transcription and navigation matching.
    ///
    /// Relative reply-audio paths in an inline result are resolved against
    /// the configured base URL before the outcome is returned.
    pub async fn submit_audio(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<SubmitAudioOutcome, SdkError> {
        let session = self.require_valid_session()?;
        self.admit()?;

        let mut data = self
            .api
            .submit_audio(&session.token, audio, file_name, cancellation)
            .await?;
        if let Some(path) = data.reply_audio_url.take() {
            data.reply_audio_url = Some(resolve_reply_audio_url(&self.base_url, &path));
        }
        Ok(classify_submission(data))
    }

    /// Takes the realtime event stream. Yields `Some` exactly once; events
    /// are delivered to whichever receiver is current, without buffering for
    /// late takers.
    pub fn realtime_events(&self) -> Option<mpsc::UnboundedReceiver<RealtimeEvent>> {
        self.events.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Latest realtime connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.realtime.state()
    }

    /// Brings the realtime channel up under the current session, including
    /// after a terminal reconnect failure. No-op without a valid session.
    pub fn connect_realtime(&self) {
        if let Some(session) = self.sessions.get() {
            if session.is_valid_at(current_epoch_ms()) {
                self.realtime.connect(session.token);
            }
        }
    }

    /// Tears the realtime channel down without touching the session.
    pub fn disconnect_realtime(&self) {
        self.realtime.disconnect();
    }

    /// Snapshot of the current session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.sessions.get()
    }

    /// True iff a session exists and has not expired.
    #[must_use]
    pub fn has_valid_session(&self) -> bool {
        self.sessions.has_valid()
    }

    /// Tears down the realtime channel and clears the stored session,
    /// including its durable copy.
    pub async fn shutdown(&self) -> Result<(), SdkError> {
        self.realtime.disconnect();
        self.sessions.clear().await?;
        Ok(())
    }

    fn require_valid_session(&self) -> Result<Session, SdkError> {
        gate_session(self.sessions.get(), current_epoch_ms())
    }

    fn admit(&self) -> Result<(), SdkError> {
        if self.limiter.admit() {
            Ok(())
        } else {
            Err(SdkError::RateLimited)
        }
    }
}

/// Session gate run before every privileged operation, ahead of any
/// transport call or rate-window consumption.
fn gate_session(session: Option<Session>, now_ms: i64) -> Result<Session, SdkError> {
    let session = session.ok_or(SdkError::NotInitialized)?;
    if !session.is_valid_at(now_ms) {
        return Err(SdkError::SessionExpired);
    }
    Ok(session)
}

fn classify_submission(data: SubmitAudioData) -> SubmitAudioOutcome {
    if data.transcription.is_none() {
        if let Some(conversation_id) = data.conversation_id.clone() {
            return SubmitAudioOutcome::Queued { conversation_id };
        }
    }
    SubmitAudioOutcome::Completed(data)
}

fn verify_identity(config: &SdkConfig) -> Result<(), SdkError> {
    let (Some(expected), Some(certificate)) =
        (&config.expected_signature_hash, &config.signing_certificate)
    else {
        return Ok(());
    };

    let identity = AppIdentity::new(&config.app_package, certificate);
    if identity.verify(expected) {
        Ok(())
    } else {
        Err(SdkError::SecurityFailure {
            reason: "application identity mismatch".to_string(),
        })
    }
}

/// Keeps the realtime channel aligned with the session lifecycle.
fn spawn_session_observer(
    mut changes: watch::Receiver<Option<SessionChange>>,
    realtime: RealtimeHandle,
) {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let change = changes.borrow_and_update().clone();
            match change {
                Some(SessionChange::Replaced(session)) => realtime.connect(session.token),
                Some(SessionChange::Cleared { prior_token }) => {
                    tracing::debug!(had_token = prior_token.is_some(), "session cleared");
                    realtime.disconnect();
                }
                None => {}
            }
        }
    });
}

/// Current wall-clock time as epoch milliseconds.
fn current_epoch_ms() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at_ms: Option<i64>) -> Session {
        Session {
            token: "sess-1".to_string(),
            issued_at_ms: 1_000,
            expires_at_ms,
        }
    }

    #[test]
    fn gate_rejects_missing_session_before_any_transport() {
        assert!(matches!(
            gate_session(None, 1_000),
            Err(SdkError::NotInitialized)
        ));
    }

    #[test]
    fn gate_rejects_expired_session() {
        assert!(matches!(
            gate_session(Some(session(Some(5_000))), 5_000),
            Err(SdkError::SessionExpired)
        ));
    }

    #[test]
    fn gate_passes_valid_and_non_expiring_sessions() {
        assert!(gate_session(Some(session(Some(5_000))), 4_999).is_ok());
        assert!(gate_session(Some(session(None)), i64::MAX).is_ok());
    }

    #[test]
    fn queued_submissions_carry_only_a_conversation_id() {
        let outcome = classify_submission(SubmitAudioData {
            conversation_id: Some("conv-1".to_string()),
            transcription: None,
            reply_text: None,
            reply_audio_url: None,
            navigation: None,
        });
        assert_eq!(
            outcome,
            SubmitAudioOutcome::Queued {
                conversation_id: "conv-1".to_string()
            }
        );
    }

    #[test]
    fn inline_results_are_completed_even_with_a_conversation_id() {
        let data = SubmitAudioData {
            conversation_id: Some("conv-2".to_string()),
            transcription: Some("open settings".to_string()),
            reply_text: Some("Opening settings".to_string()),
            reply_audio_url: None,
            navigation: None,
        };
        assert_eq!(
            classify_submission(data.clone()),
            SubmitAudioOutcome::Completed(data)
        );
    }
}
