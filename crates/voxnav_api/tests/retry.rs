use std::time::Duration;

use voxnav_api::retry::{
    base_retry_delay, is_retryable_status, retry_delay, JITTER_CEILING_MS, MAX_RETRY_DELAY,
};

#[test]
fn only_transient_statuses_are_retryable() {
    for status in [408, 429, 500, 502, 503, 504] {
        assert!(is_retryable_status(status), "{status} should retry");
    }
    for status in [200, 201, 301, 400, 401, 403, 404, 422, 501] {
        assert!(!is_retryable_status(status), "{status} should not retry");
    }
}

#[test]
fn base_delay_doubles_per_attempt() {
    let initial = Duration::from_secs(1);
    assert_eq!(base_retry_delay(initial, 1), Duration::from_secs(1));
    assert_eq!(base_retry_delay(initial, 2), Duration::from_secs(2));
    assert_eq!(base_retry_delay(initial, 3), Duration::from_secs(4));
    assert_eq!(base_retry_delay(initial, 4), Duration::from_secs(8));
}

#[test]
fn base_delay_caps_at_thirty_seconds() {
    let initial = Duration::from_secs(1);
    assert_eq!(base_retry_delay(initial, 6), MAX_RETRY_DELAY);
    assert_eq!(base_retry_delay(initial, 20), MAX_RETRY_DELAY);
    // Large attempt counts must not overflow.
    assert_eq!(base_retry_delay(initial, u32::MAX), MAX_RETRY_DELAY);
}

#[test]
fn full_delay_stays_within_jitter_band_and_cap() {
    let initial = Duration::from_millis(500);
    let jitter_ceiling = Duration::from_millis(JITTER_CEILING_MS);

    for attempt in 1..=8 {
        let base = base_retry_delay(initial, attempt);
        for _ in 0..32 {
            let delay = retry_delay(initial, attempt);
            assert!(delay >= base, "attempt {attempt}: {delay:?} below base");
            assert!(
                delay < (base + jitter_ceiling).min(MAX_RETRY_DELAY + jitter_ceiling),
                "attempt {attempt}: {delay:?} above jitter band"
            );
            assert!(delay <= MAX_RETRY_DELAY);
        }
    }
}
