//! Retry policy for reconnect-and-resubmit.
//!
//! # Responsibilities
//! - Bound retries by attempt count and/or wall-clock deadline
//! - Make unbounded retry an explicit opt-in
//! - Compute the delay before each retry

use std::time::Duration;

use crate::config::{BackoffStrategy, ReconnectConfig};
use crate::resilience::backoff::backoff_delay;

/// How often and how long a transient failure may be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, first one included. `None` is unbounded.
    max_attempts: Option<u32>,
    deadline: Option<Duration>,
    strategy: BackoffStrategy,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    /// At most `max_attempts` attempts, fixed 1s delay.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            deadline: None,
            strategy: BackoffStrategy::Fixed,
            base_delay_ms: 1000,
            max_delay_ms: 1000,
        }
    }

    /// Retry forever, fixed 1s delay.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::bounded(1)
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            max_attempts: (!config.unbounded).then_some(config.max_attempts.max(1)),
            deadline: if config.unbounded {
                None
            } else {
                config.deadline_secs.map(Duration::from_secs)
            },
            strategy: config.strategy,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Stop retrying once `deadline` has passed since the first attempt.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_backoff(mut self, strategy: BackoffStrategy, base: Duration, max: Duration) -> Self {
        self.strategy = strategy;
        self.base_delay_ms = base.as_millis() as u64;
        self.max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.deadline.is_none()
    }

    /// Whether another attempt may start after `attempts_made` failures.
    pub fn allows_retry(&self, attempts_made: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts_made >= max) {
            return false;
        }
        !self.deadline.is_some_and(|deadline| elapsed >= deadline)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff_delay(self.strategy, attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), Some(10));
        assert!(!policy.is_unbounded());
        assert_eq!(policy.delay(1), Duration::from_secs(1));
    }

    #[test]
    fn test_attempt_bound() {
        let policy = RetryPolicy::bounded(3);
        assert!(policy.allows_retry(1, Duration::ZERO));
        assert!(policy.allows_retry(2, Duration::ZERO));
        assert!(!policy.allows_retry(3, Duration::ZERO));
    }

    #[test]
    fn test_deadline_bound() {
        let policy = RetryPolicy::unbounded().with_deadline(Duration::from_secs(5));
        assert!(policy.allows_retry(1000, Duration::from_secs(4)));
        assert!(!policy.allows_retry(1, Duration::from_secs(5)));
    }

    #[test]
    fn test_unbounded_opt_in() {
        let config = ReconnectConfig {
            unbounded: true,
            deadline_secs: Some(1),
            ..ReconnectConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert!(policy.is_unbounded());
        assert!(policy.allows_retry(u32::MAX, Duration::from_secs(3600)));
    }
}
