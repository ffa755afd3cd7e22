//! Bounded exponential backoff

use crate::error::SaveError;
use std::time::Duration;

/// Retry bound and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Create policy
    #[inline]
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Retries allowed after the initial submission
    #[inline]
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `retry_count` (0-based): `base * 2^retry_count`
    #[must_use]
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether a failure after `retry_count` retries should be retried
    #[inline]
    #[must_use]
    pub fn should_retry(&self, retry_count: u32, error: &SaveError) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_protocol::ErrorCode;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.backoff(64), Duration::from_secs(u64::from(u32::MAX)));
    }

    #[test]
    fn retries_stop_at_bound() {
        let policy = RetryPolicy::default();
        let transient = SaveError::Transport("timeout".into());
        assert!(policy.should_retry(0, &transient));
        assert!(policy.should_retry(2, &transient));
        assert!(!policy.should_retry(3, &transient));
    }

    #[test]
    fn fatal_errors_never_retry() {
        let policy = RetryPolicy::default();
        let fatal = SaveError::rejected(ErrorCode::NotFound, "gone");
        assert!(!policy.should_retry(0, &fatal));
    }
}
