use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SessionStoreError;
use crate::store::Session;

const RECORD_VERSION: u32 = 1;

/// On-disk form of the single session record.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedSession {
    pub version: u32,
    pub token: String,
    pub issued_at_ms: i64,
    pub expires_at_ms: Option<i64>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            version: RECORD_VERSION,
            token: session.token.clone(),
            issued_at_ms: session.issued_at_ms,
            expires_at_ms: session.expires_at_ms,
        }
    }
}

/// Loads the persisted session record, if any.
///
/// A missing file is a normal empty store. A corrupt or version-mismatched
/// record is discarded rather than surfaced; the caller reinitializes.
pub(crate) fn load(path: &Path) -> Result<Option<Session>, SessionStoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SessionStoreError::io("reading session record", path, source)),
    };

    match serde_json::from_str::<PersistedSession>(&raw) {
        Ok(record) if record.version == RECORD_VERSION => Ok(Some(Session {
            token: record.token,
            issued_at_ms: record.issued_at_ms,
            expires_at_ms: record.expires_at_ms,
        })),
        Ok(record) => {
            tracing::warn!(
                version = record.version,
                "discarding session record with unsupported version"
            );
            Ok(None)
        }
        Err(error) => {
            tracing::warn!(%error, "discarding unreadable session record");
            Ok(None)
        }
    }
}

pub(crate) fn write(path: &Path, record: &PersistedSession) -> Result<(), SessionStoreError> {
    let encoded = serde_json::to_vec(record)
        .map_err(|source| SessionStoreError::json_serialize(path, source))?;
    fs::write(path, encoded)
        .map_err(|source| SessionStoreError::io("writing session record", path, source))
}

pub(crate) fn remove(path: &Path) -> Result<(), SessionStoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionStoreError::io(
            "removing session record",
            path,
            source,
        )),
    }
}
