//! Poll cadence and wall-clock budgets
//!
//! Every polling point takes a `PollPolicy`: how long to sleep between
//! status queries and, optionally, how long the whole wait may take.
//! Budgets are enforced by the caller's poll loop through a `Deadline`;
//! nothing here sleeps or talks to the network.

use std::time::{Duration, Instant};

/// Longest budget accepted for a single wait (one day).
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Upload polling cadence (default: 15 s)
pub const DEFAULT_UPLOAD_POLL_SECONDS: u64 = 15;

/// Upload polling budget (default: 300 s = 5 min)
pub const DEFAULT_UPLOAD_TIMEOUT_SECONDS: u64 = 300;

/// Run polling cadence (default: 60 s)
pub const DEFAULT_RUN_POLL_SECONDS: u64 = 60;

/// Poll cadence and optional wall-clock budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two status queries
    pub interval: Duration,

    /// Budget measured from the first query; `None` polls indefinitely
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    /// Upload defaults: short cadence, bounded budget
    pub fn upload_default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_UPLOAD_POLL_SECONDS),
            Some(Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECONDS)),
        )
    }

    /// Run defaults: coarse cadence, no budget
    pub fn run_default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RUN_POLL_SECONDS), None)
    }

    /// Build from whole seconds, as found in configuration
    pub fn from_seconds(interval_seconds: u64, timeout_seconds: Option<u64>) -> Self {
        Self::new(
            Duration::from_secs(interval_seconds),
            timeout_seconds.map(Duration::from_secs),
        )
    }

    /// Validate bounds: interval > 0, timeout in (0, 86400 s]
    pub fn validate(&self) -> Result<(), PollPolicyError> {
        if self.interval.is_zero() {
            return Err(PollPolicyError::ZeroInterval);
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() || timeout > Duration::from_secs(MAX_TIMEOUT_SECONDS) {
                return Err(PollPolicyError::TimeoutOutOfBounds {
                    value: timeout.as_secs_f64(),
                });
            }
        }

        Ok(())
    }
}

/// Poll policy validation errors
#[derive(Debug, thiserror::Error)]
pub enum PollPolicyError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("timeout must be in (0, {MAX_TIMEOUT_SECONDS}] seconds, got {value}")]
    TimeoutOutOfBounds { value: f64 },
}

/// Wall-clock deadline for one wait
///
/// Started at the first status query. Only reports whether the budget is
/// exhausted; the poll loop decides what to do about it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Start measuring now
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// True once elapsed time strictly exceeds the budget
    pub fn is_exceeded(&self) -> bool {
        match self.budget {
            Some(budget) => self.elapsed() > budget,
            None => false,
        }
    }

    /// Remaining budget, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.elapsed()))
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}
