//! policy.rs
//!
//! Retry policies for the EMG source. The poller never hard-codes its sleeps:
//! every delay it takes while reconnecting or recovering from a failed poll is
//! read from a [`RetryPolicy`].
//!
//! The reconnect delay for attempt `n` is `first × factor^n`, clamped to `max`.
//! With the default `factor = 1.0` the delay is a constant 10 s; a larger
//! factor and `max` are set through `HubConfig`.

use std::time::Duration;

/// Growth of the delay between consecutive connection attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any retry delay.
    pub max: Duration,
    /// Multiplicative growth factor.
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::constant(Duration::from_secs(10))
    }
}

impl BackoffPolicy {
    /// A policy that always waits `delay`.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(64) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        Duration::try_from_secs_f64(secs).map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Full retry behaviour of the EMG poller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Backoff between failed connection attempts.
    pub connect: BackoffPolicy,
    /// Extra wait after a failed poll, before reconnecting.
    pub poll_error_delay: Duration,
    /// Give up after this many consecutive failed connects. `None` retries forever.
    pub max_connect_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect: BackoffPolicy::default(),
            poll_error_delay: Duration::from_secs(5),
            max_connect_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `failures` consecutive failed connects, or `None`
    /// once the attempt budget is spent.
    pub fn reconnect_delay(&self, failures: u32) -> Option<Duration> {
        match self.max_connect_attempts {
            Some(max) if failures >= max => None,
            _ => Some(self.connect.next(failures.saturating_sub(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_is_constant_ten_seconds() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next(0), Duration::from_secs(10));
        assert_eq!(policy.next(7), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
        };
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(10), Duration::from_secs(1));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_unbounded_retry_never_gives_up() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.reconnect_delay(1), Some(Duration::from_secs(10)));
        assert_eq!(policy.reconnect_delay(10_000), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_bounded_retry_stops_at_budget() {
        let policy = RetryPolicy {
            max_connect_attempts: Some(3),
            ..Default::default()
        };
        assert!(policy.reconnect_delay(1).is_some());
        assert!(policy.reconnect_delay(2).is_some());
        assert_eq!(policy.reconnect_delay(3), None);
    }
}
