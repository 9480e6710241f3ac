use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{watch, Mutex};

use crate::error::SessionStoreError;
use crate::persist::{self, PersistedSession};

/// The single active session for one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer credential issued by the backend.
    pub token: String,
    /// Epoch milliseconds at which the session was stored locally.
    pub issued_at_ms: i64,
    /// Optional epoch-millisecond expiry; absent means no local expiry.
    pub expires_at_ms: Option<i64>,
}

impl Session {
    /// True while the session has not expired at `now_ms`.
    #[must_use]
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        match self.expires_at_ms {
            Some(expires_at) => now_ms < expires_at,
            None => true,
        }
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// The whole session was replaced.
    Replaced(Session),
    /// The session was cleared; carries the prior token for cleanup
    /// correlation, never the (nonexistent) new state.
    Cleared { prior_token: Option<String> },
}

/// Owner of the current session, with optional durable persistence.
///
/// Mutations (`set`/`clear`) are serialized behind a writer lock; `get` and
/// `has_valid` are snapshot reads of the latest committed value. When a
/// session file is configured, the durable write completes on a blocking task
/// before subscribers are notified.
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    writer: Mutex<()>,
    path: Option<PathBuf>,
    changes: watch::Sender<Option<SessionChange>>,
}

impl SessionStore {
    /// Store without durable persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            current: RwLock::new(None),
            writer: Mutex::new(()),
            path: None,
            changes,
        }
    }

    /// Opens a store backed by a single-record session file.
    ///
    /// An existing record is loaded so the session survives process restarts;
    /// a corrupt record is discarded and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let existing = persist::load(&path)?;
        let (changes, _) = watch::channel(None);
        Ok(Self {
            current: RwLock::new(existing),
            writer: Mutex::new(()),
            path: Some(path),
            changes,
        })
    }

    /// Replaces the session atomically.
    ///
    /// The durable copy is written before listeners observe the change, so a
    /// crash between write and notify is healed on the next restart.
    pub async fn set(
        &self,
        token: impl Into<String>,
        expires_at_ms: Option<i64>,
    ) -> Result<Session, SessionStoreError> {
        let session = Session {
            token: token.into(),
            issued_at_ms: now_ms(),
            expires_at_ms,
        };

        let _writer = self.writer.lock().await;
        if let Some(path) = &self.path {
            let path = path.clone();
            let record = PersistedSession::from(&session);
            tokio::task::spawn_blocking(move || persist::write(&path, &record))
                .await
                .map_err(|join| SessionStoreError::TaskJoin(join.to_string()))??;
        }

        self.commit(Some(session.clone()), SessionChange::Replaced(session.clone()));
        tracing::debug!(expires_at_ms, "session replaced");
        Ok(session)
    }

    /// Removes the in-memory and durable copies, then notifies subscribers
    /// with the prior token.
    pub async fn clear(&self) -> Result<(), SessionStoreError> {
        let _writer = self.writer.lock().await;
        if let Some(path) = &self.path {
            let path = path.clone();
            tokio::task::spawn_blocking(move || persist::remove(&path))
                .await
                .map_err(|join| SessionStoreError::TaskJoin(join.to_string()))??;
        }

        let prior_token = self.get().map(|session| session.token);
        self.commit(None, SessionChange::Cleared { prior_token });
        tracing::debug!("session cleared");
        Ok(())
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.current
            .read()
            .map(|session| session.clone())
            .unwrap_or_default()
    }

    /// True iff a session exists and has not expired.
    #[must_use]
    pub fn has_valid(&self) -> bool {
        self.get()
            .is_some_and(|session| session.is_valid_at(now_ms()))
    }

    /// Subscribes to session changes. The receiver starts at `None` and sees
    /// the latest committed change thereafter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionChange>> {
        self.changes.subscribe()
    }

    fn commit(&self, next: Option<Session>, change: SessionChange) {
        if let Ok(mut current) = self.current.write() {
            *current = next;
        }
        // send_replace keeps the latest change observable even with no
        // subscriber attached yet.
        self.changes.send_replace(Some(change));
    }
}

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub(crate) fn now_ms() -> i64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
