// Retry policy for outbound Linear API calls

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ApiError;

/// Hard ceiling on retries for any outbound call.
///
/// Activity and comment mutations are retried at most once; a second failure
/// is reported to the caller.
pub const MAX_RETRIES: u32 = 1;

/// Retry policy for transient errors.
///
/// Controls backoff behavior for the single permitted retry. Values above
/// [`MAX_RETRIES`] are clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 or 1)
    pub max_retries: u32,

    /// Initial delay before first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 for doubling)
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings.
    ///
    /// `max_retries` is clamped to [`MAX_RETRIES`].
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.min(MAX_RETRIES),
            initial_delay,
            max_delay,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries, clamped to [`MAX_RETRIES`].
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES);
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Enable jitter (±25% random variation) in retry delays.
    pub fn with_jitter(mut self) -> Self {
        self.use_jitter = true;
        self
    }

    /// Disable jitter in retry delays.
    ///
    /// Use this for deterministic testing.
    ///
    /// # Examples
    ///
    /// ```
    /// use linear_agent_sdk::client::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default().without_jitter();
    /// assert!(!policy.use_jitter);
    /// ```
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Calculate delay for a specific retry attempt (1-indexed).
    ///
    /// Uses exponential backoff capped at `max_delay`, with ±25% jitter when
    /// enabled. Attempt 0 has no delay.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let multiplier = self.backoff_multiplier.powi(exponent);
        let delay_ms = (self.initial_delay.as_millis() as f64 * multiplier) as u64;
        let mut delay = Duration::from_millis(delay_ms);

        if delay > self.max_delay {
            delay = self.max_delay;
        }

        if self.use_jitter {
            use rand::Rng;
            let jitter_factor = rand::thread_rng().gen_range(0.75..=1.25);
            delay = Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64);
        }

        delay
    }

    /// Check if another retry attempt should be made.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Number of retries already made
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries.min(MAX_RETRIES)
    }
}

/// Which failures a request may be retried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Any transient failure. For idempotent calls (update, delete).
    Transient,

    /// Only failures where the request never reached the server. For calls
    /// that create remote records, so a retry cannot duplicate them.
    ConnectOnly,
}

impl RetryMode {
    pub fn allows(&self, error: &ApiError) -> bool {
        match self {
            Self::Transient => error.is_transient(),
            Self::ConnectOnly => error.is_connect_failure(),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
