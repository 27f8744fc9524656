//! Failure Injection for the mock service
//!
//! Failures are keyed by operation name (`get-upload`, `schedule-run`, ...).

use std::collections::HashMap;
use std::time::Duration;

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error text surfaced as the failing command's stderr
    pub message: Option<String>,
    /// Delay to add before responding
    pub delay: Option<Duration>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
    /// Number of successful calls to let through before failing
    pub after: u32,
}

impl FailureConfig {
    /// Create a config that returns an error
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            delay: None,
            fail_count: None,
            after: 0,
        }
    }

    /// Expired credentials, the usual mid-run failure of a status query
    pub fn expired_credentials() -> Self {
        Self::error("An error occurred (ExpiredTokenException): The security token included in the request is expired")
    }

    /// Create a config that just adds delay
    pub fn delay(duration: Duration) -> Self {
        Self {
            message: None,
            delay: Some(duration),
            fail_count: None,
            after: 0,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Let the first `calls` calls succeed before failing
    pub fn after_calls(mut self, calls: u32) -> Self {
        self.after = calls;
        self
    }
}

/// Failure injector for the mock service
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-operation failure configs
    configs: HashMap<&'static str, FailureConfig>,
    /// Call counts per operation (for after/fail_count tracking)
    call_counts: HashMap<&'static str, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: &'static str, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Inject an error for an operation
    pub fn inject_error(&mut self, op: &'static str, message: impl Into<String>) {
        self.inject(op, FailureConfig::error(message));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for a specific operation
    pub fn clear_op(&mut self, op: &str) {
        self.configs.remove(op);
        self.call_counts.remove(op);
    }

    /// Check if a failure should occur for an operation
    ///
    /// Returns the failure config if one should occur, None otherwise.
    pub fn check(&mut self, op: &'static str) -> Option<&FailureConfig> {
        let config = self.configs.get(op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if *count <= config.after {
            return None;
        }

        if let Some(fail_limit) = config.fail_count {
            if *count - config.after > fail_limit {
                return None;
            }
        }

        Some(config)
    }

    /// Get the delay for an operation (if any)
    pub fn get_delay(&self, op: &str) -> Option<Duration> {
        self.configs.get(op).and_then(|c| c.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_config_error() {
        let config = FailureConfig::error("boom");
        assert_eq!(config.message.as_deref(), Some("boom"));
        assert!(config.delay.is_none());
    }

    #[test]
    fn test_failure_injector_basic() {
        let mut injector = FailureInjector::new();

        assert!(injector.check("get-run").is_none());

        injector.inject_error("schedule-run", "ArgumentException");

        let config = injector.check("schedule-run");
        assert!(config.is_some());
        assert_eq!(config.unwrap().message.as_deref(), Some("ArgumentException"));
    }

    #[test]
    fn test_failure_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject("get-upload", FailureConfig::error("throttled").with_fail_count(2));

        assert!(injector.check("get-upload").is_some());
        assert!(injector.check("get-upload").is_some());
        assert!(injector.check("get-upload").is_none());
    }

    #[test]
    fn test_failure_injector_after_calls() {
        let mut injector = FailureInjector::new();
        injector.inject("get-run", FailureConfig::expired_credentials().after_calls(2));

        assert!(injector.check("get-run").is_none());
        assert!(injector.check("get-run").is_none());
        assert!(injector.check("get-run").is_some());
        assert!(injector.check("get-run").is_some());
    }

    #[test]
    fn test_failure_injector_clear() {
        let mut injector = FailureInjector::new();

        injector.inject_error("create-upload", "msg");
        assert!(injector.check("create-upload").is_some());

        injector.clear_op("create-upload");
        assert!(injector.check("create-upload").is_none());
    }
}
