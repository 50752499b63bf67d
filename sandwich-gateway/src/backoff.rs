//! Reconnect backoff helpers shared by the shard's reconnect loop.

use std::time::Duration;

/// `base_ms * 2^attempt`, capped at `max_ms`.
pub fn exponential_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Add up to `jitter_factor` extra, chosen uniformly at random.
pub fn with_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    use rand::Rng;

    let jitter_range = (duration.as_millis() as f64 * jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range.max(1)) % (jitter_range + 1);
    duration + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt_until_the_cap() {
        assert_eq!(exponential_backoff(0, 1000, 60_000), Duration::from_millis(1000));
        assert_eq!(exponential_backoff(1, 1000, 60_000), Duration::from_millis(2000));
        assert_eq!(exponential_backoff(2, 1000, 60_000), Duration::from_millis(4000));
        assert_eq!(exponential_backoff(10, 1000, 60_000), Duration::from_millis(60_000));
    }

    #[test]
    fn jitter_never_reduces_the_base_duration() {
        let base = Duration::from_millis(1000);
        for _ in 0..20 {
            let jittered = with_jitter(base, 0.2);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_millis(200));
        }
    }
}
