//! Bounded retry policy shared by the data fetcher and the push gateway.
//!
//! Rate-limited attempts back off linearly (`attempt * base`), transient
//! failures wait a fixed shorter delay. Every attempt runs under its own
//! timeout, and an optional deadline bounds the whole operation.

use std::time::Duration;

use tokio::time::Instant;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay multiplied by the attempt number after a 429.
const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Fixed delay after a network failure or attempt timeout.
const NETWORK_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Timeout for a single attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an attempt is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    RateLimited,
    Transient,
}

/// The deadline passed before the operation could finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Deadline exceeded")]
pub struct DeadlineExceeded;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base_delay: Duration,
    pub network_retry_delay: Duration,
    pub attempt_timeout: Duration,
    pub deadline: Option<Instant>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_base_delay: RATE_LIMIT_BASE_DELAY,
            network_retry_delay: NETWORK_RETRY_DELAY,
            attempt_timeout: ATTEMPT_TIMEOUT,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delays(mut self, rate_limit_base: Duration, network: Duration) -> Self {
        self.rate_limit_base_delay = rate_limit_base;
        self.network_retry_delay = network;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Bound the whole operation, retries included.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay(&self, attempt: u32, reason: RetryReason) -> Duration {
        match reason {
            RetryReason::RateLimited => self.rate_limit_base_delay * attempt,
            RetryReason::Transient => self.network_retry_delay,
        }
    }

    /// Time budget for the next attempt: the attempt timeout, capped by
    /// whatever is left before the deadline.
    pub fn attempt_budget(&self) -> Result<Duration, DeadlineExceeded> {
        match self.deadline {
            None => Ok(self.attempt_timeout),
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    Err(DeadlineExceeded)
                } else {
                    Ok(left.min(self.attempt_timeout))
                }
            }
        }
    }

    /// Sleep before the next attempt. Fails without sleeping when the
    /// deadline would pass during the wait.
    pub async fn backoff(
        &self,
        attempt: u32,
        reason: RetryReason,
    ) -> Result<Duration, DeadlineExceeded> {
        let delay = self.delay(attempt, reason);
        if let Some(deadline) = self.deadline {
            if Instant::now() + delay >= deadline {
                return Err(DeadlineExceeded);
            }
        }
        tokio::time::sleep(delay).await;
        Ok(delay)
    }
}
