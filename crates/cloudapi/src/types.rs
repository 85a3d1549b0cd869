//! Request options and timing policies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optional sections to include when reading a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Include current and pending plans.
    pub show_plans: bool,
    /// Include component settings.
    pub show_settings: bool,
    /// Include endpoint metadata.
    pub show_metadata: bool,
}

impl QueryParams {
    /// Everything reconciliation needs.
    #[must_use]
    pub fn full() -> Self {
        Self {
            show_plans: true,
            show_settings: true,
            show_metadata: true,
        }
    }

    /// Render as a URL query string (without the leading `?`).
    #[must_use]
    pub fn to_query(&self) -> String {
        format!(
            "show_plans={}&show_metadata={}&show_settings={}",
            self.show_plans, self.show_metadata, self.show_settings
        )
    }
}

/// The control plane accepted a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accepted {
    /// Deployment the change applies to.
    pub id: String,
}

/// Configuration for retry behavior.
///
/// Delays grow linearly: attempt `n` (0-indexed) waits `base_delay * (n + 1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.saturating_add(1))
            .min(self.max_delay)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Timing policy for waiting on a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Overall wall-clock bound
    pub timeout: Duration,
    /// Pause between reads
    pub poll_interval: Duration,
    /// Retry policy for each individual read
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(40 * 60),
            poll_interval: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}
