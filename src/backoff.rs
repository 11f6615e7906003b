//! Exponential backoff with jitter
//!
//! Pure attempt-number -> delay computation used by the retrying HTTP client.

use std::time::Duration;

use rand::Rng;

/// Delays never drop below this regardless of jitter draw.
const MIN_DELAY_MS: u64 = 100;

/// Attempts beyond this are treated as already at the cap to avoid overflow
/// in the exponent.
const CAP_ATTEMPT: u32 = 20;

/// Parameters for one backoff profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

/// Profile for retrying 5xx responses
pub const SERVER_ERROR_BACKOFF: BackoffPolicy = BackoffPolicy {
    base_delay: Duration::from_millis(2000),
    max_delay: Duration::from_millis(60_000),
    jitter_factor: 0.3,
};

/// Profile for retrying proxy/connection failures
pub const PROXY_ERROR_BACKOFF: BackoffPolicy = BackoffPolicy {
    base_delay: Duration::from_millis(500),
    max_delay: Duration::from_millis(10_000),
    jitter_factor: 0.2,
};

impl BackoffPolicy {
    /// Compute the delay before the given retry attempt (clamped to >= 1).
    ///
    /// Exponential `base * 2^(attempt-1)` capped at `max_delay`, then
    /// multiplicative jitter drawn uniformly from ±`jitter_factor`, floored
    /// at 100 ms. Uses a thread-local generator so concurrent callers never
    /// contend on shared RNG state.
    pub fn delay(&self, attempt: u32) -> Duration {
        let r: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with_jitter_draw(attempt, r)
    }

    /// Deterministic inner computation; `r` must be in [-1, 1].
    fn delay_with_jitter_draw(&self, attempt: u32, r: f64) -> Duration {
        let attempt = attempt.max(1);

        let capped_ms = if attempt > CAP_ATTEMPT {
            self.max_delay.as_millis() as u64
        } else {
            let exponential = (self.base_delay.as_millis() as u64)
                .saturating_mul(1u64 << (attempt - 1));
            exponential.min(self.max_delay.as_millis() as u64)
        };

        let jitter = capped_ms as f64 * self.jitter_factor * r;
        let with_jitter = (capped_ms as f64 + jitter).max(MIN_DELAY_MS as f64);

        Duration::from_millis(with_jitter as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_JITTER: BackoffPolicy = BackoffPolicy {
        base_delay: Duration::from_millis(1000),
        max_delay: Duration::from_millis(30_000),
        jitter_factor: 0.0,
    };

    #[test]
    fn test_zero_jitter_is_pure_exponential() {
        assert_eq!(NO_JITTER.delay(1), Duration::from_millis(1000));
        assert_eq!(NO_JITTER.delay(2), Duration::from_millis(2000));
        assert_eq!(NO_JITTER.delay(3), Duration::from_millis(4000));
        assert_eq!(NO_JITTER.delay(5), Duration::from_millis(16_000));
    }

    #[test]
    fn test_delay_caps_at_max() {
        assert_eq!(NO_JITTER.delay(6), Duration::from_millis(30_000));
        assert_eq!(NO_JITTER.delay(19), Duration::from_millis(30_000));
    }

    #[test]
    fn test_attempt_clamped_to_one() {
        assert_eq!(NO_JITTER.delay(0), Duration::from_millis(1000));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        assert_eq!(NO_JITTER.delay(u32::MAX), Duration::from_millis(30_000));
        assert_eq!(NO_JITTER.delay(21), Duration::from_millis(30_000));
    }

    #[test]
    fn test_jitter_stays_within_band() {
        let policy = SERVER_ERROR_BACKOFF;
        for attempt in 1..=10 {
            let capped = NO_JITTER_CAPPED(policy, attempt);
            for _ in 0..100 {
                let d = policy.delay(attempt).as_millis() as f64;
                let low = (capped * (1.0 - policy.jitter_factor)).max(100.0);
                let high = capped * (1.0 + policy.jitter_factor);
                assert!(
                    d >= low - 1.0 && d <= high + 1.0,
                    "attempt {attempt}: delay {d} outside [{low}, {high}]"
                );
            }
        }
    }

    #[allow(non_snake_case)]
    fn NO_JITTER_CAPPED(policy: BackoffPolicy, attempt: u32) -> f64 {
        let base = policy.base_delay.as_millis() as u64;
        let max = policy.max_delay.as_millis() as u64;
        base.saturating_mul(1u64 << (attempt - 1)).min(max) as f64
    }

    #[test]
    fn test_floor_at_100ms() {
        let tiny = BackoffPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            jitter_factor: 1.0,
        };
        for _ in 0..100 {
            assert!(tiny.delay(1) >= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_named_profiles() {
        assert_eq!(SERVER_ERROR_BACKOFF.base_delay, Duration::from_millis(2000));
        assert_eq!(SERVER_ERROR_BACKOFF.max_delay, Duration::from_millis(60_000));
        assert_eq!(PROXY_ERROR_BACKOFF.base_delay, Duration::from_millis(500));
        assert_eq!(PROXY_ERROR_BACKOFF.max_delay, Duration::from_millis(10_000));
    }

    #[test]
    fn test_deterministic_jitter_draw() {
        let policy = BackoffPolicy {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(60_000),
            jitter_factor: 0.5,
        };
        // r = 1.0 -> capped * 1.5; r = -1.0 -> capped * 0.5
        assert_eq!(
            policy.delay_with_jitter_draw(1, 1.0),
            Duration::from_millis(1500)
        );
        assert_eq!(
            policy.delay_with_jitter_draw(1, -1.0),
            Duration::from_millis(500)
        );
        assert_eq!(
            policy.delay_with_jitter_draw(1, 0.0),
            Duration::from_millis(1000)
        );
    }
}
