//! Outcome classes and the process exit codes they map to

use df_protocol::Counters;
use serde::{Deserialize, Serialize};

/// Terminal classification of one run attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    /// Every test passed
    Success,
    /// At least one test failed
    Failed,
    /// Inconclusive: devices never started, tests stopped or skipped, ...
    Errored,
    /// Monitoring itself failed; the run's real outcome is unknown
    ErroredWithException,
}

impl OutcomeClass {
    /// Classify final counters
    ///
    /// `total == passed` wins, then `failed > 0`, everything else is
    /// errored. The `errored` counter is deliberately not consulted.
    pub fn classify(counters: &Counters) -> Self {
        if counters.total == counters.passed {
            OutcomeClass::Success
        } else if counters.failed > 0 {
            OutcomeClass::Failed
        } else {
            OutcomeClass::Errored
        }
    }

    /// Exit code for this class
    ///
    /// Unless `fail_on_error` is set, `Errored` exits successfully.
    pub fn exit_code(&self, fail_on_error: bool) -> ExitCode {
        match self {
            OutcomeClass::Success => ExitCode::Success,
            OutcomeClass::Failed => ExitCode::TestsFailed,
            OutcomeClass::Errored if fail_on_error => ExitCode::TestsErrored,
            OutcomeClass::Errored => ExitCode::Success,
            OutcomeClass::ErroredWithException => ExitCode::ErroredWithException,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeClass::Success => "success",
            OutcomeClass::Failed => "failed",
            OutcomeClass::Errored => "errored",
            OutcomeClass::ErroredWithException => "errored_with_exception",
        }
    }
}

impl std::fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    /// Configuration could not be loaded or validated
    ConfigError = 1,
    /// Inconclusive results
    TestsErrored = -1,
    /// Confirmed test failures
    TestsFailed = -2,
    /// Upload, scheduling or monitoring failed
    ErroredWithException = -3,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::ConfigError),
            -1 => Some(ExitCode::TestsErrored),
            -2 => Some(ExitCode::TestsFailed),
            -3 => Some(ExitCode::ErroredWithException),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u32, passed: u32, failed: u32) -> Counters {
        Counters {
            total,
            passed,
            failed,
            ..Counters::default()
        }
    }

    #[test]
    fn test_classification_examples() {
        assert_eq!(OutcomeClass::classify(&counters(24, 24, 0)), OutcomeClass::Success);
        assert_eq!(OutcomeClass::classify(&counters(24, 20, 2)), OutcomeClass::Failed);
        assert_eq!(OutcomeClass::classify(&counters(24, 20, 0)), OutcomeClass::Errored);
    }

    #[test]
    fn test_errored_counter_not_consulted() {
        let c = Counters {
            total: 5,
            passed: 3,
            errored: 2,
            ..Counters::default()
        };
        assert_eq!(OutcomeClass::classify(&c), OutcomeClass::Errored);
    }

    #[test]
    fn test_empty_run_is_success() {
        assert_eq!(OutcomeClass::classify(&Counters::default()), OutcomeClass::Success);
    }

    #[test]
    fn test_errored_downgrade() {
        assert_eq!(OutcomeClass::Errored.exit_code(false), ExitCode::Success);
        assert_eq!(OutcomeClass::Errored.exit_code(true), ExitCode::TestsErrored);
        assert_eq!(OutcomeClass::Failed.exit_code(false), ExitCode::TestsFailed);
        assert_eq!(
            OutcomeClass::ErroredWithException.exit_code(false).as_i32(),
            -3
        );
    }

    #[test]
    fn test_exit_code_round_trip() {
        for code in [0, 1, -1, -2, -3] {
            assert_eq!(ExitCode::from_i32(code).map(|c| c.as_i32()), Some(code));
        }
        assert_eq!(ExitCode::from_i32(80), None);
    }

    #[test]
    fn test_class_serialization() {
        assert_eq!(
            serde_json::to_string(&OutcomeClass::ErroredWithException).unwrap(),
            r#""errored_with_exception""#
        );
    }
}
