//! Pipeline orchestration
//!
//! Threads one `LaneConfig`, API transport, transfer adapter and cancel
//! token through the stages of a test run:
//!
//! 1. Upload the app, test package and test spec (fail-fast)
//! 2. Schedule the run
//! 3. Monitor it to completion
//! 4. Collect result artifacts
//!
//! Steps 1 and 2 return errors. Steps 3 and 4 always end in a
//! `MonitorResult`. A run record written after step 2 lets a later process
//! resume at step 3.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_protocol::{
    decode, ListDevicePoolsResponse, ListProjectsResponse, ScheduleRunResponse, TestType,
    UploadRole,
};

use crate::artifact::ArtifactCollector;
use crate::config::LaneConfig;
use crate::error::{FarmError, FarmResult};
use crate::host::{ApiTransport, ArtifactTransfer, DeviceFarmClient};
use crate::job::RemoteJob;
use crate::monitor::{write_json, MonitorResult, RunMonitor};
use crate::poller::StatusPoller;
use crate::schedule::{
    upload_type_for, validate_identity, Requirement, RunRequest, RunScheduler, ScheduledRun,
    UploadRequirements,
};
use crate::signal::CancelToken;
use crate::timeout::PollPolicy;
use crate::upload::{UploadManager, UploadRequest};

/// Local files and settings for one test run
#[derive(Debug, Clone, PartialEq)]
pub struct TestRunSpec {
    pub project_arn: String,
    /// `None` picks the project's first PRIVATE pool
    pub device_pool_arn: Option<String>,
    pub name: String,
    pub test_type: TestType,
    pub app: Option<PathBuf>,
    pub test_package: Option<PathBuf>,
    pub test_spec: Option<PathBuf>,
}

impl TestRunSpec {
    pub fn file(&self, role: UploadRole) -> Option<&Path> {
        match role {
            UploadRole::AppPackage => self.app.as_deref(),
            UploadRole::TestPackage => self.test_package.as_deref(),
            UploadRole::TestSpec => self.test_spec.as_deref(),
        }
    }

    /// Check supplied files against the test type before uploading anything
    pub fn validate(&self) -> FarmResult<()> {
        validate_identity(&self.project_arn, &self.name)?;

        let requirements = UploadRequirements::for_test_type(self.test_type);
        for role in [UploadRole::AppPackage, UploadRole::TestPackage, UploadRole::TestSpec] {
            match (requirements.get(role), self.file(role)) {
                (Requirement::Required, None) => {
                    return Err(FarmError::InvalidRunRequest(format!(
                        "{} requires a {}",
                        self.test_type, role
                    )))
                }
                (Requirement::NotAccepted, Some(path)) => {
                    return Err(FarmError::InvalidRunRequest(format!(
                        "{} does not accept a {} ({})",
                        self.test_type,
                        role,
                        path.display()
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Where monitoring writes its results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorOutputs {
    /// Download allow-listed artifacts under this directory
    pub artifact_dir: Option<PathBuf>,
    /// Write the final run payload here
    pub output_file: Option<PathBuf>,
}

/// Pipeline execution context
pub struct Pipeline {
    config: LaneConfig,
    client: DeviceFarmClient,
    transfer: Arc<dyn ArtifactTransfer>,
    cancel: CancelToken,
    upload_policy: PollPolicy,
    run_policy: PollPolicy,
}

impl Pipeline {
    pub fn new(
        config: LaneConfig,
        transport: Arc<dyn ApiTransport>,
        transfer: Arc<dyn ArtifactTransfer>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            upload_policy: config.upload_policy(),
            run_policy: config.run_policy(),
            config,
            client: DeviceFarmClient::new(transport),
            transfer,
            cancel,
        }
    }

    /// Override the upload cadence and budget taken from the config
    pub fn with_upload_policy(mut self, policy: PollPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    /// Override the run cadence and budget taken from the config
    pub fn with_run_policy(mut self, policy: PollPolicy) -> Self {
        self.run_policy = policy;
        self
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    fn poller(&self) -> StatusPoller {
        StatusPoller::new(self.cancel.clone()).with_progress(self.config.progress)
    }

    fn uploader(&self) -> UploadManager {
        UploadManager::new(
            self.client.clone(),
            Arc::clone(&self.transfer),
            self.poller(),
            self.upload_policy,
        )
    }

    fn collector(&self) -> ArtifactCollector {
        ArtifactCollector::new(self.client.clone(), Arc::clone(&self.transfer), self.cancel.clone())
    }

    /// Upload the run's local files and schedule it
    ///
    /// Any upload failure aborts before scheduling.
    pub fn schedule_test(&self, spec: &TestRunSpec) -> FarmResult<ScheduledRun> {
        spec.validate()?;

        let uploader = self.uploader();
        let mut request = RunRequest::new(&spec.project_arn, &spec.name, spec.test_type);
        if let Some(pool) = &spec.device_pool_arn {
            request = request.with_device_pool(pool);
        }

        for role in [UploadRole::AppPackage, UploadRole::TestPackage, UploadRole::TestSpec] {
            let (Some(path), Some(upload_type)) =
                (spec.file(role), upload_type_for(spec.test_type, role))
            else {
                continue;
            };
            let job = uploader.upload(&UploadRequest::new(path, upload_type, &spec.project_arn))?;
            request = request.with_upload(role, job);
        }

        RunScheduler::new(self.client.clone(), self.config.customer_artifact_ios_paths.clone())
            .submit(&request)
    }

    /// Monitor a run and collect its artifacts; never fails
    pub fn monitor_run(&self, job: &mut RemoteJob, outputs: &MonitorOutputs) -> MonitorResult {
        RunMonitor::new(
            self.client.clone(),
            self.collector(),
            self.poller(),
            self.run_policy.interval,
            &self.config.region,
        )
        .with_artifact_dir(outputs.artifact_dir.clone())
        .with_output_file(outputs.output_file.clone())
        .monitor(job, self.run_policy.timeout)
    }

    /// Schedule, then monitor to completion
    pub fn run_to_completion(
        &self,
        spec: &TestRunSpec,
        outputs: &MonitorOutputs,
    ) -> FarmResult<(ScheduledRun, MonitorResult)> {
        let scheduled = self.schedule_test(spec)?;
        let mut job = scheduled.job.clone();
        let result = self.monitor_run(&mut job, outputs);
        Ok((scheduled, result))
    }

    /// List artifacts of a run, downloading when `artifact_dir` is given
    pub fn collect_artifacts(
        &self,
        run_arn: &str,
        artifact_dir: Option<&Path>,
    ) -> FarmResult<crate::artifact::Collection> {
        self.collector().collect(run_arn, artifact_dir)
    }

    pub fn list_projects(&self) -> FarmResult<ListProjectsResponse> {
        self.client
            .list_projects()
            .map_err(|e| FarmError::api("list-projects", e))
    }

    pub fn list_device_pools(&self, project_arn: &str) -> FarmResult<ListDevicePoolsResponse> {
        self.client
            .list_device_pools(project_arn)
            .map_err(|e| FarmError::api("list-device-pools", e))
    }
}

/// Persist the raw `schedule-run` response
pub fn write_run_record(path: &Path, scheduled: &ScheduledRun) -> FarmResult<()> {
    write_json(path, &scheduled.response)?;
    tracing::info!(path = %path.display(), arn = %scheduled.job.arn, "wrote run record");
    Ok(())
}

/// Load a run reference from a run record
pub fn read_run_record(path: &Path) -> FarmResult<RemoteJob> {
    let text = fs::read_to_string(path).map_err(|e| FarmError::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let response: ScheduleRunResponse = decode("run record", &value)
        .map_err(|e| FarmError::MalformedJobReference(format!("{}: {}", path.display(), e)))?;
    Ok(RemoteJob::run(response.run.arn, response.run.status))
}
