//! Retry policy
//!
//! Decides whether a failed attempt is tried again and how long to back off
//! first. Classification is driven by [`Error::is_retryable`]; 4xx statuses are
//! turned into [`Error::NonRetryable`] by [`classify_status`] and are therefore
//! never retried.

use crate::config::RetryConfig;
use crate::error::Error;
use reqwest::StatusCode;
use std::time::Duration;

/// Outcome of evaluating a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then re-enter the rate limiter and send again
    Retry { delay: Duration },
    /// The failure is not transient; surface it as-is
    Fail,
    /// Transient failure, but the attempt budget is spent
    Exhausted,
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Exponential backoff policy without jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` counts the first attempt
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff(),
            config.max_backoff(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }

    /// Evaluate a failure after `attempts_made` attempts (1 after the first failure)
    pub fn evaluate(&self, error: &Error, attempts_made: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Fail;
        }
        if attempts_made >= self.max_attempts {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry {
            delay: self.backoff(attempts_made.saturating_sub(1)),
        }
    }
}

/// Turn a non-success status and its body into the matching error kind
pub fn classify_status(status: StatusCode, body: String) -> Error {
    if status.is_server_error() {
        Error::HttpStatus {
            status: status.as_u16(),
            body,
        }
    } else {
        Error::NonRetryable {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use test_case::test_case;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }

    #[test]
    fn test_backoff_exact_values() {
        let policy = policy();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_non_decreasing_and_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(300), Duration::from_secs(2));
        let mut previous = Duration::ZERO;
        for attempt in 0..40 {
            let delay = policy.backoff(attempt);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_secs(2));
            previous = delay;
        }
        assert_eq!(policy.backoff(39), Duration::from_secs(2));
    }

    #[test_case(500 ; "internal server error")]
    #[test_case(502 ; "bad gateway")]
    #[test_case(503 ; "unavailable")]
    #[test_case(504 ; "gateway timeout")]
    fn test_server_errors_retry(status: u16) {
        let error = classify_status(StatusCode::from_u16(status).unwrap(), String::new());
        assert_eq!(
            policy().evaluate(&error, 1),
            RetryDecision::Retry {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(
            policy().evaluate(&error, 2),
            RetryDecision::Retry {
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(policy().evaluate(&error, 3), RetryDecision::Exhausted);
    }

    #[test_case(400 ; "bad request")]
    #[test_case(401 ; "unauthorized")]
    #[test_case(404 ; "not found")]
    #[test_case(409 ; "conflict")]
    #[test_case(429 ; "too many requests")]
    fn test_client_errors_fail_immediately(status: u16) {
        let error = classify_status(StatusCode::from_u16(status).unwrap(), "nope".to_string());
        assert!(error.is_non_retryable());
        assert_eq!(policy().evaluate(&error, 1), RetryDecision::Fail);
    }

    #[test]
    fn test_timeout_is_retried() {
        let error = Error::Timeout { timeout_ms: 30_000 };
        assert!(policy().evaluate(&error, 1).should_retry());
        assert_eq!(policy().evaluate(&error, 3), RetryDecision::Exhausted);
    }

    #[test]
    fn test_decode_error_not_retried() {
        let error = Error::decode("expected value at line 1 column 1");
        assert_eq!(policy().evaluate(&error, 1), RetryDecision::Fail);
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
        let error = Error::Timeout { timeout_ms: 1 };
        assert_eq!(policy.evaluate(&error, 1), RetryDecision::Exhausted);
    }
}
