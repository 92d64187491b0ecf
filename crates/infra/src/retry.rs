//! Bounded retry for transient store failures.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::entity_store::StoreError;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Run once, never retry.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy's attempts are
/// used up. Only [`StoreError::is_transient`] failures are retried.
pub fn retry_transient<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "retried operation succeeded");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(label, attempt, max_attempts, delay_ms = delay.as_millis() as u64, error = %err, "transient store failure, retrying");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::exponential(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(50), Duration::from_millis(150));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(150));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(150));
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = retry_transient(&fast(3), "test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(StoreError::Unavailable("timeout".into()))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn attempts_are_bounded() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient(&fast(3), "test", || {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("down".into()))
        });
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient(&fast(5), "test", || {
            calls.set(calls.get() + 1);
            Err(StoreError::Backend("syntax error".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn no_retry_runs_once() {
        let calls = Cell::new(0);
        let _: Result<(), _> = retry_transient(&RetryPolicy::no_retry(), "test", || {
            calls.set(calls.get() + 1);
            Err(StoreError::Unavailable("down".into()))
        });
        assert_eq!(calls.get(), 1);
    }
}
