//! Bounded retry with jittered exponential backoff.

use std::time::Duration;

use rand::Rng;

use tessera_shared::config::CodeGenConfig;

/// Retry policy for contended allocations and transient database errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub base_backoff: Duration,
    /// Ceiling for any single backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CodeGenConfig::default())
    }
}

impl RetryPolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub fn from_config(config: &CodeGenConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Returns true if another attempt may follow attempt number `attempt` (1-based).
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Upper bound of the backoff after attempt number `attempt` (1-based).
    #[must_use]
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Jittered backoff after attempt `attempt`, uniform in `[ceiling/2, ceiling]`.
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let ceiling = u64::try_from(self.ceiling(attempt).as_millis()).unwrap_or(u64::MAX);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(ceiling / 2..=ceiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_defaults_follow_config() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_backoff, Duration::from_millis(20));
        assert_eq!(p.max_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_should_retry_is_bounded() {
        let p = policy();
        assert!(p.should_retry(1));
        assert!(p.should_retry(4));
        assert!(!p.should_retry(5));
    }

    #[test]
    fn test_ceiling_doubles_then_caps() {
        let p = policy();
        assert_eq!(p.ceiling(1), Duration::from_millis(20));
        assert_eq!(p.ceiling(2), Duration::from_millis(40));
        assert_eq!(p.ceiling(4), Duration::from_millis(160));
        assert_eq!(p.ceiling(6), Duration::from_millis(500));
        assert_eq!(p.ceiling(64), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_within_jitter_window() {
        let p = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=8 {
            let ceiling = p.ceiling(attempt);
            let delay = p.backoff(attempt, &mut rng);
            assert!(delay <= ceiling);
            assert!(delay >= ceiling / 2);
        }
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let config = CodeGenConfig {
            max_attempts: 0,
            ..CodeGenConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 1);
    }
}
