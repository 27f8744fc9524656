//! Shared setup for integration tests
//!
//! Builds pipelines over the in-process mock service with millisecond poll
//! intervals and writes placeholder app/test files into a temp directory.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use devicefarm_lane::mock::{MockDeviceFarm, MockTransfer};
use devicefarm_lane::{CancelToken, LaneConfig, Pipeline, PollPolicy, TestRunSpec};
use df_protocol::{Artifact, ArtifactType, TestType};
use tempfile::TempDir;

pub fn quiet_config() -> LaneConfig {
    let mut config = LaneConfig::default();
    config.progress = false;
    config
}

/// Millisecond cadence with a budget in milliseconds
pub fn fast_policy(timeout_ms: u64) -> PollPolicy {
    PollPolicy::new(
        Duration::from_millis(2),
        Some(Duration::from_millis(timeout_ms)),
    )
}

pub struct Harness {
    pub farm: MockDeviceFarm,
    pub transfer: MockTransfer,
    pub cancel: CancelToken,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            farm: MockDeviceFarm::new(),
            transfer: MockTransfer::new(),
            cancel: CancelToken::new(),
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(quiet_config())
    }

    pub fn pipeline_with(&self, config: LaneConfig) -> Pipeline {
        Pipeline::new(
            config,
            Arc::new(self.farm.clone()),
            Arc::new(self.transfer.clone()),
            self.cancel.clone(),
        )
        .with_upload_policy(fast_policy(5_000))
        .with_run_policy(fast_policy(5_000))
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a placeholder file and return its path
    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// A complete XCTEST_UI run against the mock project
    pub fn xctest_ui_spec(&self) -> TestRunSpec {
        TestRunSpec {
            project_arn: self.farm.project_arn(),
            device_pool_arn: None,
            name: "nightly-ui".to_string(),
            test_type: TestType::XctestUi,
            app: Some(self.file("Maps.ipa", "ipa bytes")),
            test_package: Some(self.file("MapsUITests.zip", "xctest bytes")),
            test_spec: Some(self.file("testspec.yml", "version: 0.1\n")),
        }
    }

    /// A fuzz run, which only needs the app
    pub fn fuzz_spec(&self) -> TestRunSpec {
        TestRunSpec {
            project_arn: self.farm.project_arn(),
            device_pool_arn: None,
            name: "fuzz".to_string(),
            test_type: TestType::BuiltinFuzz,
            app: Some(self.file("Maps.ipa", "ipa bytes")),
            test_package: None,
            test_spec: None,
        }
    }
}

pub fn artifact(id: &str, name: &str, artifact_type: ArtifactType) -> Artifact {
    Artifact {
        arn: format!(
            "arn:aws:devicefarm:us-west-2:111122223333:artifact:P/R/J/S/{}",
            id
        ),
        name: name.to_string(),
        artifact_type,
        extension: "zip".to_string(),
        url: format!("https://artifacts.devicefarm.test/{}", id),
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
