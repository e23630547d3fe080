//! Configuration types for flow runners and combinators.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`FlowRunner`](crate::runner::FlowRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Whether a dependency change should trigger a new run.
    #[serde(default = "default_auto_run")]
    pub auto_run: bool,
    /// Emits human-readable lifecycle log lines when no event sink is set.
    #[serde(default)]
    pub dev: bool,
    /// Default policy for [`FlowContext::retry`](crate::context::FlowContext::retry).
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_auto_run() -> bool {
    true
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            auto_run: default_auto_run(),
            dev: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl FlowConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the auto-run flag.
    #[must_use]
    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// Sets the dev instrumentation flag.
    #[must_use]
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    /// Sets the default retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Fixed-delay retry policy.
///
/// The delay does not grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. Zero behaves as one.
    #[serde(default = "default_retries")]
    pub retries: usize,
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_retries() -> usize {
    3
}

fn default_delay_ms() -> u64 {
    300
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and delay.
    #[must_use]
    pub fn new(retries: usize, delay: Duration) -> Self {
        Self {
            retries,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Returns the delay as a `Duration`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Returns the effective number of attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.retries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flow_config_defaults() {
        let config = FlowConfig::default();
        assert!(config.auto_run);
        assert!(!config.dev);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_from_json_partial() {
        let config = FlowConfig::from_json(r#"{"dev": true, "retry": {"retries": 5}}"#).unwrap();
        assert_eq!(
            config,
            FlowConfig {
                auto_run: true,
                dev: true,
                retry: RetryPolicy {
                    retries: 5,
                    delay_ms: 300,
                },
            }
        );
    }

    #[test]
    fn test_from_json_empty_object() {
        let config = FlowConfig::from_json("{}").unwrap();
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(FlowConfig::from_json(r#"{"auto_run": "yes"}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let config = FlowConfig::new()
            .with_auto_run(false)
            .with_dev(true)
            .with_retry(RetryPolicy::new(2, Duration::from_millis(10)));

        assert!(!config.auto_run);
        assert!(config.dev);
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.retry.delay_ms, 10);
    }

    #[test]
    fn test_zero_retries_is_one_attempt() {
        let policy = RetryPolicy::default().with_retries(0);
        assert_eq!(policy.attempts(), 1);
    }
}
