//! # Coordinator Configuration
//!
//! Retry policy and coordinator settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff for transient storage conflicts.
///
/// Applies ONLY to infrastructure failures (`DbError::is_retryable`).
/// Business outcomes - shortfalls, missing items - are never retried:
/// retrying a shortfall can't conjure stock, and retrying against a
/// corrupted item would hammer a halted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before giving up (first try included).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff duration (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Backoff to sleep after the given zero-based failed attempt:
    /// `initial * 2^attempt`, capped at `max_backoff_ms`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_backoff_ms
            .saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(exp.min(self.max_backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    4
}
fn default_initial_backoff() -> u64 {
    25
}
fn default_max_backoff() -> u64 {
    1_000
}

// =============================================================================
// Reserve Config
// =============================================================================

/// Reservation coordinator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReserveConfig {
    /// Retry policy for transient storage conflicts.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ReserveConfig {
    /// Sets the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff_ms: 25,
            max_backoff_ms: 100,
        };

        assert_eq!(policy.backoff_for(0), Duration::from_millis(25));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(50));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(100));
        // Capped from here on.
        assert_eq!(policy.backoff_for(3), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(63), Duration::from_millis(100));
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert!(policy.initial_backoff_ms < policy.max_backoff_ms);
    }
}
