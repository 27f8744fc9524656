//! Built-in defaults (layer 1) and the typed configuration

use serde::{Deserialize, Serialize};

use crate::timeout::{
    PollPolicy, DEFAULT_RUN_POLL_SECONDS, DEFAULT_UPLOAD_POLL_SECONDS,
    DEFAULT_UPLOAD_TIMEOUT_SECONDS,
};

use super::effective::ConfigError;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = ".devicefarm/lane.toml";

/// Poll cadence and budget of one polling point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub poll_interval_seconds: u64,

    /// None polls indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl PollSettings {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::from_seconds(self.poll_interval_seconds, self.timeout_seconds)
    }
}

/// Merged, validated configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Region of every remote call and of the dashboard URL
    pub region: String,

    /// Vendor CLI executable
    pub aws_cli: String,

    /// Named credentials profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    pub upload: PollSettings,

    pub run: PollSettings,

    /// Device paths collected as customer artifacts
    pub customer_artifact_ios_paths: Vec<String>,

    /// Keep "errored" runs failing instead of exiting 0
    pub fail_on_error: bool,

    /// Print one dot per poll tick
    pub progress: bool,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            aws_cli: "aws".to_string(),
            profile: None,
            upload: PollSettings {
                poll_interval_seconds: DEFAULT_UPLOAD_POLL_SECONDS,
                timeout_seconds: Some(DEFAULT_UPLOAD_TIMEOUT_SECONDS),
            },
            run: PollSettings {
                poll_interval_seconds: DEFAULT_RUN_POLL_SECONDS,
                timeout_seconds: None,
            },
            customer_artifact_ios_paths: vec!["Documents".to_string()],
            fail_on_error: false,
            progress: true,
        }
    }
}

impl LaneConfig {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> Result<serde_json::Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn upload_policy(&self) -> PollPolicy {
        self.upload.policy()
    }

    pub fn run_policy(&self) -> PollPolicy {
        self.run.policy()
    }

    /// Validate value bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::ValidationError("region must not be empty".to_string()));
        }
        if self.aws_cli.trim().is_empty() {
            return Err(ConfigError::ValidationError("aws_cli must not be empty".to_string()));
        }
        self.upload_policy()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("upload: {}", e)))?;
        self.run_policy()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("run: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = LaneConfig::default();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.aws_cli, "aws");
        assert_eq!(config.upload.poll_interval_seconds, 15);
        assert_eq!(config.upload.timeout_seconds, Some(300));
        assert_eq!(config.run.poll_interval_seconds, 60);
        assert_eq!(config.run.timeout_seconds, None);
        assert_eq!(config.customer_artifact_ios_paths, vec!["Documents"]);
        assert!(!config.fail_on_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_value() {
        let value = LaneConfig::default().to_value().unwrap();

        assert_eq!(value["upload"]["timeout_seconds"], 300);
        assert!(value["run"].get("timeout_seconds").is_none());
        assert!(value.get("profile").is_none());
    }

    #[test]
    fn test_policies() {
        let config = LaneConfig::default();
        assert_eq!(config.run_policy().interval, Duration::from_secs(60));
        assert_eq!(config.upload_policy().timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = LaneConfig::default();
        config.run.poll_interval_seconds = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("run"));
    }

    #[test]
    fn test_timeout_over_a_day_rejected() {
        let mut config = LaneConfig::default();
        config.upload.timeout_seconds = Some(86_401);
        assert!(config.validate().is_err());
    }
}
