//! Retry policy of the mesh bootstrapper.

use std::time::Duration;

/// Pause inserted after a failed resolution or dial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Resample immediately
    #[default]
    None,

    /// `base * 2^(n-1)` after the n-th consecutive failure, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// How the bootstrapper reacts to failed attempts
///
/// The default resamples immediately and never gives up; random resampling
/// spreads load across the fleet instead of hammering one unreachable peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub backoff: Backoff,

    /// Total failures tolerated before bootstrap gives up
    pub max_failures: Option<u64>,
}

impl RetryPolicy {
    /// Immediate resampling, unbounded
    pub const fn immediate() -> Self {
        Self { backoff: Backoff::None, max_failures: None }
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff = Backoff::Exponential { base, max: max.max(base) };
        self
    }

    pub fn with_max_failures(mut self, max_failures: u64) -> Self {
        self.max_failures = Some(max_failures);
        self
    }

    /// Delay to apply after `consecutive` failures in a row
    pub fn delay_after(&self, consecutive: u32) -> Option<Duration> {
        match self.backoff {
            Backoff::None => None,
            Backoff::Exponential { .. } if consecutive == 0 => None,
            Backoff::Exponential { base, max } => {
                let factor = 1u32.checked_shl(consecutive - 1).unwrap_or(u32::MAX);
                Some(base.saturating_mul(factor).min(max))
            }
        }
    }

    /// Whether `failures` total failures exhaust the budget
    pub fn is_exhausted(&self, failures: u64) -> bool {
        self.max_failures.is_some_and(|max| failures >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_never_waits_or_gives_up() {
        let policy = RetryPolicy::default();
        assert_eq!(policy, RetryPolicy::immediate());
        assert_eq!(policy.delay_after(1), None);
        assert_eq!(policy.delay_after(1000), None);
        assert!(!policy.is_exhausted(u64::MAX));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::immediate()
            .with_backoff(Duration::from_millis(10), Duration::from_millis(100));

        assert_eq!(policy.delay_after(0), None);
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(20)));
        assert_eq!(policy.delay_after(4), Some(Duration::from_millis(80)));
        assert_eq!(policy.delay_after(5), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(64), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_failure_budget() {
        let policy = RetryPolicy::immediate().with_max_failures(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }
}
