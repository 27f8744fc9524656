//! Run operation types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Test framework a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestType {
    BuiltinFuzz,
    Xctest,
    XctestUi,
    AppiumNode,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuiltinFuzz => "BUILTIN_FUZZ",
            Self::Xctest => "XCTEST",
            Self::XctestUi => "XCTEST_UI",
            Self::AppiumNode => "APPIUM_NODE",
        }
    }

    pub fn all() -> [TestType; 4] {
        [Self::BuiltinFuzz, Self::Xctest, Self::XctestUi, Self::AppiumNode]
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown test type: {}", s))
    }
}

/// The `test` argument of `schedule-run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRunTest {
    #[serde(rename = "type")]
    pub test_type: TestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_package_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_spec_arn: Option<String>,
}

/// Device paths collected as customer artifacts after the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerArtifactPaths {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ios_paths: Vec<String>,
}

/// The `configuration` argument of `schedule-run`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRunConfiguration {
    pub customer_artifact_paths: CustomerArtifactPaths,
}

impl ScheduleRunConfiguration {
    pub fn with_ios_paths(paths: Vec<String>) -> Self {
        Self {
            customer_artifact_paths: CustomerArtifactPaths { ios_paths: paths },
        }
    }
}

/// Result counters of a run.
///
/// `total`, `passed` and `failed` decide the outcome and must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub warned: u32,
    #[serde(default)]
    pub errored: u32,
    #[serde(default)]
    pub stopped: u32,
    #[serde(default)]
    pub skipped: u32,
}

impl Counters {
    /// Sum of the per-outcome buckets that should add up to `total`.
    ///
    /// `warned` is reported separately by the service and not part of the sum.
    pub fn bucket_sum(&self) -> u64 {
        [self.passed, self.failed, self.errored, self.stopped, self.skipped]
            .iter()
            .map(|&c| u64::from(c))
            .sum()
    }

    /// True when the buckets do not add up to `total`.
    pub fn is_inconsistent(&self) -> bool {
        self.bucket_sum() != u64::from(self.total)
    }
}

/// Run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub arn: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Counters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `schedule-run` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRunResponse {
    pub run: Run,
}

/// `get-run` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRunResponse {
    pub run: Run,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_run_response_parses_counters() {
        let value = json!({
            "run": {
                "arn": "arn:aws:devicefarm:us-west-2:111:run:p/r",
                "status": "COMPLETED",
                "result": "PASSED",
                "counters": {
                    "errored": 0, "failed": 0, "passed": 24,
                    "skipped": 0, "stopped": 0, "total": 24, "warned": 0
                }
            }
        });
        let response: GetRunResponse = serde_json::from_value(value).unwrap();
        let counters = response.run.counters.unwrap();
        assert_eq!(counters.total, 24);
        assert_eq!(counters.passed, 24);
        assert!(!counters.is_inconsistent());
    }

    #[test]
    fn test_counters_missing_buckets_default_to_zero() {
        let counters: Counters =
            serde_json::from_value(json!({"total": 3, "passed": 1, "failed": 1})).unwrap();
        assert_eq!(counters.errored, 0);
        assert!(counters.is_inconsistent());
    }

    #[test]
    fn test_counters_require_classification_fields() {
        assert!(serde_json::from_value::<Counters>(json!({})).is_err());
        assert!(serde_json::from_value::<Counters>(json!({"total": 3, "passed": 3})).is_err());
    }

    #[test]
    fn test_schedule_run_test_omits_missing_arns() {
        let test = ScheduleRunTest {
            test_type: TestType::Xctest,
            test_package_arn: Some("pkg".to_string()),
            test_spec_arn: None,
        };
        let value = serde_json::to_value(&test).unwrap();
        assert_eq!(value, json!({"type": "XCTEST", "testPackageArn": "pkg"}));
    }

    #[test]
    fn test_configuration_shape() {
        let config = ScheduleRunConfiguration::with_ios_paths(vec!["Documents".to_string()]);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value, json!({"customerArtifactPaths": {"iosPaths": ["Documents"]}}));
    }

    #[test]
    fn test_test_type_from_str() {
        assert_eq!("XCTEST_UI".parse::<TestType>().unwrap(), TestType::XctestUi);
        assert_eq!("xctest".parse::<TestType>().unwrap(), TestType::Xctest);
        assert!("ESPRESSO".parse::<TestType>().is_err());
    }
}
