//! Retry policy
//!
//! Delays are in milliseconds and double per retry up to a ceiling. With
//! jitter on, each delay is drawn from the upper half of its ceiling.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ApiError;
use crate::types::HttpMethod;

/// When and how often a failed request is sent again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts, the original request included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Ceiling of any single delay.
    pub max_delay_ms: u64,
    pub jitter: bool,
    /// Also retry POST and PATCH, which may not be safe to repeat.
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 10_000,
            jitter: true,
            retry_non_idempotent: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay_ms = base.as_millis() as u64;
        self.max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_non_idempotent(mut self, retry: bool) -> Self {
        self.retry_non_idempotent = retry;
        self
    }

    /// Whether a request with `method` that failed with `error` may be sent again.
    pub fn allows(&self, error: &ApiError, method: HttpMethod) -> bool {
        error.is_retryable() && (self.retry_non_idempotent || method.is_idempotent())
    }

    /// Upper bound of the delay before retry number `retry` (0-based).
    pub fn ceiling_ms(&self, retry: u32) -> u64 {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let ceiling = self.ceiling_ms(retry);
        let ms = if self.jitter && ceiling > 1 {
            rand::thread_rng().gen_range(ceiling / 2..=ceiling)
        } else {
            ceiling
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_doubles_and_caps() {
        let policy = RetryPolicy::new(5)
            .with_delays(Duration::from_millis(100), Duration::from_millis(350))
            .with_jitter(false);
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(350));
        assert_eq!(policy.ceiling_ms(80), 350);
    }

    #[test]
    fn jitter_stays_in_upper_half() {
        let policy = RetryPolicy::new(3).with_delays(Duration::from_millis(1000), Duration::from_secs(5));
        for _ in 0..50 {
            let ms = policy.delay(0).as_millis();
            assert!((500..=1000).contains(&ms), "{ms}");
        }
    }

    #[test]
    fn only_idempotent_methods_by_default() {
        let policy = RetryPolicy::default();
        let busy = ApiError::http(503, "busy");
        assert!(policy.allows(&busy, HttpMethod::Get));
        assert!(policy.allows(&busy, HttpMethod::Put));
        assert!(!policy.allows(&busy, HttpMethod::Post));
        assert!(!policy.allows(&ApiError::http(404, "missing"), HttpMethod::Get));
        assert!(policy.with_non_idempotent(true).allows(&busy, HttpMethod::Post));
    }

    #[test]
    fn deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"maxAttempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 250);
        assert!(!policy.retry_non_idempotent);
    }
}
