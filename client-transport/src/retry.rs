//! Fixed-delay retry policy.
//!
//! Every failure is retried the same way: there is no notion of a
//! non-retryable error here. Callers that must not repeat an operation keep
//! it out of the retried closure.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::CallConfig;
use crate::context::RequestContext;

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl From<&CallConfig> for RetryConfig {
    fn from(config: &CallConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            delay: config.backoff_delay,
        }
    }
}

/// Runs an operation until it succeeds or attempts run out.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Maximum number of attempts. Never less than 1.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.config.delay
    }

    /// Run `operation` up to [`max_attempts`](Self::max_attempts) times.
    ///
    /// `operation` receives the 1-based attempt number. Each failed attempt
    /// is logged at warning level through the context's logger. Retrying
    /// stops early, without sleeping, when the context deadline would pass
    /// before the next attempt starts.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt made.
    pub async fn execute<F, Fut, T, E>(
        &self,
        ctx: &RequestContext,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let logger = ctx.logger();
            logger.warn(
                &format!("{operation_name}: inner attempt failed"),
                &[
                    ("attempt", attempt.to_string()),
                    ("max_attempts", max_attempts.to_string()),
                    ("error", error.to_string()),
                ],
            );

            if attempt >= max_attempts {
                return Err(error);
            }

            // the next attempt would start at or after the deadline
            if ctx.remaining().is_some_and(|left| left <= self.config.delay) {
                logger.warn(
                    &format!("{operation_name}: deadline reached before next attempt, giving up"),
                    &[("attempts", attempt.to_string())],
                );
                return Err(error);
            }

            if !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }

            if ctx.is_expired() {
                logger.warn(
                    &format!("{operation_name}: deadline exceeded, giving up"),
                    &[("attempts", attempt.to_string())],
                );
                return Err(error);
            }

            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl From<&CallConfig> for RetryPolicy {
    fn from(config: &CallConfig) -> Self {
        Self::new(RetryConfig::from(config))
    }
}
