//! Retry policy for [`HttpTransport`](crate::HttpTransport).
//!
//! The dispatch core never retries. Retrying is a transport concern, set
//! on [`ClientConfig`](crate::ClientConfig) or per call through
//! [`TransportOptions`](crate::TransportOptions).

use std::time::Duration;

use crate::error::ClientError;

/// Statuses retried unless the caller picks its own set.
const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
    /// Response statuses that trigger another attempt.
    pub retry_status_codes: Vec<u16>,
    /// Retry requests that timed out or never connected.
    pub retry_transport_errors: bool,
    /// Give up once this much time has passed since the first attempt.
    pub max_retry_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(100))
    }
}

impl RetryConfig {
    fn with_backoff(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            backoff,
            retry_status_codes: TRANSIENT_STATUSES.to_vec(),
            retry_transport_errors: true,
            max_retry_time: Some(Duration::from_secs(60)),
        }
    }

    /// Delay doubling from `initial_delay`, capped at 30 seconds.
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self::with_backoff(
            max_attempts,
            BackoffStrategy::Exponential {
                initial: initial_delay,
                max: Duration::from_secs(30),
            },
        )
    }

    /// The same delay before every retry.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self::with_backoff(max_attempts, BackoffStrategy::Constant(delay))
    }

    /// Retry without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::with_backoff(max_attempts, BackoffStrategy::None)
    }

    /// Replace the retried status codes.
    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retry_status_codes = codes;
        self
    }

    /// Set the overall retry deadline.
    pub fn with_max_retry_time(mut self, duration: Duration) -> Self {
        self.max_retry_time = Some(duration);
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt.saturating_sub(1))
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Whether a response status should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }

    /// Whether a transport error should be retried.
    ///
    /// Errors carrying a status follow the status list. Timeouts and
    /// connection failures follow `retry_transport_errors`.
    pub fn should_retry_error(&self, error: &ClientError) -> bool {
        if let Some(status) = error.status_code() {
            return self.should_retry_status(status);
        }
        let transport_failure = match error {
            ClientError::Http(e) => e.is_connect() || e.is_timeout(),
            other => other.is_timeout(),
        };
        transport_failure && self.retry_transport_errors
    }
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// No delay.
    None,
    /// Fixed delay.
    Constant(Duration),
    /// Delay doubling each retry, capped at `max`.
    Exponential {
        /// First delay.
        initial: Duration,
        /// Upper bound.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Delay before the 0-indexed retry.
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Constant(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}
