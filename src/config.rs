//! Configuration for catalog building and dataset writing.
//!
//! Provides the knobs a catalog run can vary (retry budget, backoff base,
//! collection description) while the dataset column contract stays fixed in
//! [`crate::constants`].

use crate::constants::{COLLECTION_DESCRIPTION, DEFAULT_BACKOFF_SECS, DEFAULT_RETRIES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for transient throttling failures on dataset writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of attempts before giving up
    pub retries: usize,

    /// Base backoff delay in seconds; retry N waits `backoff * 2^(N-1)`
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff_secs: DEFAULT_BACKOFF_SECS,
        }
    }
}

impl RetryConfig {
    /// Delay to sleep before the retry following `attempt` (1-based)
    pub fn delay_before_retry(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as u32;
        Duration::from_secs(self.backoff_secs.saturating_mul(1u64 << exponent))
    }
}

/// Global configuration for a catalog build run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Free-text description written to the collection document
    pub description: String,

    /// Retry policy applied by the resilient dataset writer
    pub retry: RetryConfig,

    /// Show a progress bar while summarizing files
    pub show_progress: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            description: COLLECTION_DESCRIPTION.to_string(),
            retry: RetryConfig::default(),
            show_progress: true,
        }
    }
}

impl CatalogConfig {
    /// Create configuration with a custom collection description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Create configuration with a custom retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Disable progress reporting (quiet mode)
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_per_attempt() {
        let retry = RetryConfig {
            retries: 5,
            backoff_secs: 5,
        };

        assert_eq!(retry.delay_before_retry(1), Duration::from_secs(5));
        assert_eq!(retry.delay_before_retry(2), Duration::from_secs(10));
        assert_eq!(retry.delay_before_retry(3), Duration::from_secs(20));
        assert_eq!(retry.delay_before_retry(4), Duration::from_secs(40));
    }

    #[test]
    fn test_defaults_match_store_recommendations() {
        let retry = RetryConfig::default();
        assert_eq!(retry.retries, 5);
        assert_eq!(retry.backoff_secs, 5);
    }

    #[test]
    fn test_builder_methods() {
        let config = CatalogConfig::default()
            .with_description("test dataset")
            .without_progress();

        assert_eq!(config.description, "test dataset");
        assert!(!config.show_progress);
    }
}
