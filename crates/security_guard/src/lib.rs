//! App-identity verification and request rate limiting.
//!
//! Both checks run before privileged SDK operations. The rate limiter is a
//! sliding-window counter over a trailing window; identity verification is a
//! pure comparison against a locally computed signing-certificate hash.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

/// Default trailing window for rate limiting.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter over a trailing window.
///
/// The prune-check-record sequence runs under a single lock so two
/// near-simultaneous callers can never both claim the last remaining slot.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    cap: usize,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(cap: usize, window: Duration) -> Self {
        Self {
            window,
            cap,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Rate limiter with the default one-minute window.
    pub fn per_minute(cap: usize) -> Self {
        Self::new(cap, DEFAULT_RATE_WINDOW)
    }

    /// Admits or rejects one request at the current instant.
    ///
    /// Entries older than the window are pruned first; a rejected attempt is
    /// not recorded and does not extend the window.
    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    fn admit_at(&self, now: Instant) -> bool {
        let mut stamps = match self.stamps.lock() {
            Ok(guard) => guard,
            // A poisoned window only ever under-counts; fail closed instead.
            Err(_) => return false,
        };

        while let Some(front) = stamps.front() {
            if now.duration_since(*front) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.cap {
            return false;
        }

        stamps.push_back(now);
        true
    }

    /// Number of admitted requests still inside the window.
    pub fn in_window(&self) -> usize {
        self.stamps.lock().map(|stamps| stamps.len()).unwrap_or(0)
    }

    /// Clears all recorded admissions.
    pub fn reset(&self) {
        if let Ok(mut stamps) = self.stamps.lock() {
            stamps.clear();
        }
    }
}

/// Locally computed application identity.
///
/// The signature hash is derived once from the app's signing certificate and
/// cached; verification against an expected hash is a pure comparison and is
/// never retried.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    package: String,
    signature_hash: String,
}

impl AppIdentity {
    pub fn new(package: impl Into<String>, signing_certificate: &[u8]) -> Self {
        Self {
            package: package.into(),
            signature_hash: certificate_hash(signing_certificate),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Base64-encoded SHA-256 hash of the signing certificate.
    pub fn signature_hash(&self) -> &str {
        &self.signature_hash
    }

    /// Compares the local signature hash against an expected value.
    pub fn verify(&self, expected_hash: &str) -> bool {
        self.signature_hash == expected_hash
    }
}

/// Hashes a signing certificate into its transportable identity form.
pub fn certificate_hash(signing_certificate: &[u8]) -> String {
    let digest = Sha256::digest(signing_certificate);
    general_purpose::STANDARD.encode(digest)
}
