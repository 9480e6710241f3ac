use std::time::Duration;

use rand::Rng;

/// HTTP statuses that justify another transport attempt.
pub const RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Upper bound on any single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Exclusive upper bound on the random jitter added to each delay.
pub const JITTER_CEILING_MS: u64 = 1_000;

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Deterministic component of the backoff delay for a retry attempt.
///
/// Doubles per attempt from `initial_delay`, capped at [`MAX_RETRY_DELAY`].
/// `attempt` counts from 1.
#[must_use]
pub fn base_retry_delay(initial_delay: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(30);
    let millis = u64::try_from(initial_delay.as_millis())
        .unwrap_or(u64::MAX)
        .saturating_mul(2u64.saturating_pow(exponent));
    Duration::from_millis(millis).min(MAX_RETRY_DELAY)
}

/// Full backoff delay: deterministic base plus up to one second of jitter,
/// still capped at [`MAX_RETRY_DELAY`].
#[must_use]
pub fn retry_delay(initial_delay: Duration, attempt: u32) -> Duration {
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_CEILING_MS));
    (base_retry_delay(initial_delay, attempt) + jitter).min(MAX_RETRY_DELAY)
}
