//! Bounded retry with exponential backoff for destination calls

use std::future::Future;
use std::time::Duration;

use courier_core::RetrySettings;

use crate::destination::DestinationError;

/// How many times a single destination call is attempted and how long to wait between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            multiplier: 2,
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }

    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 2,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after the `attempt`-th failure (1-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Final error of a retried call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub error: DestinationError,
    pub attempts: u32,
    /// True when the budget ran out on transient errors, false on a terminal rejection
    pub exhausted: bool,
}

/// Run `operation` until it succeeds, fails terminally, or the attempt budget is spent.
///
/// Only [`DestinationError::Transient`] errors are retried. The closure receives the
/// 1-based attempt number.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DestinationError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retriable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient destination error, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(error) => {
                return Err(RetryFailure {
                    exhausted: error.is_retriable(),
                    attempts: attempt,
                    error,
                })
            }
        }
    }
}
