use std::time::Duration;

/// Cap multiplier on the linear reconnect backoff.
pub const MAX_DELAY_FACTOR: u32 = 10;

/// Backoff before reconnect attempt `attempt` (counting from 1).
///
/// Grows linearly with the attempt number and caps at ten times the base
/// delay. The realtime channel favors fast recovery, so this stays linear
/// rather than exponential.
#[must_use]
pub fn reconnect_delay(base_delay: Duration, attempt: u32) -> Duration {
    let factor = attempt.max(1).min(MAX_DELAY_FACTOR);
    base_delay.saturating_mul(factor)
}
