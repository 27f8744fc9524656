//! Run scheduling
//!
//! Builds a `schedule-run` request from a test type, a device pool and the
//! upload references that test type needs. The request is validated locally
//! first; an invalid request never reaches the network. Scheduling returns as
//! soon as the service accepts the run, without polling.

use df_protocol::{
    DevicePoolType, ScheduleRunConfiguration, ScheduleRunTest, TestType, UploadRole, UploadType,
};
use serde_json::Value;

use crate::error::{FarmError, FarmResult};
use crate::host::{DeviceFarmClient, ScheduleRunRequest};
use crate::job::RemoteJob;

/// Whether a test type takes an upload in a given role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Supplying one is an error
    NotAccepted,
}

/// Upload requirements of one test type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRequirements {
    pub app: Requirement,
    pub test_package: Requirement,
    pub test_spec: Requirement,
}

impl UploadRequirements {
    pub fn for_test_type(test_type: TestType) -> Self {
        use Requirement::*;
        match test_type {
            TestType::BuiltinFuzz => Self {
                app: Required,
                test_package: NotAccepted,
                test_spec: NotAccepted,
            },
            TestType::Xctest => Self {
                app: Required,
                test_package: Required,
                test_spec: NotAccepted,
            },
            TestType::XctestUi => Self {
                app: Required,
                test_package: Required,
                test_spec: Required,
            },
            TestType::AppiumNode => Self {
                app: Optional,
                test_package: Required,
                test_spec: Optional,
            },
        }
    }

    pub fn get(&self, role: UploadRole) -> Requirement {
        match role {
            UploadRole::AppPackage => self.app,
            UploadRole::TestPackage => self.test_package,
            UploadRole::TestSpec => self.test_spec,
        }
    }
}

/// Upload type to use for `role` under `test_type`, if the role is accepted
pub fn upload_type_for(test_type: TestType, role: UploadRole) -> Option<UploadType> {
    if UploadRequirements::for_test_type(test_type).get(role) == Requirement::NotAccepted {
        return None;
    }
    match (test_type, role) {
        (_, UploadRole::AppPackage) => Some(UploadType::IosApp),
        (TestType::Xctest, UploadRole::TestPackage) => Some(UploadType::XctestTestPackage),
        (TestType::XctestUi, UploadRole::TestPackage) => Some(UploadType::XctestUiTestPackage),
        (TestType::XctestUi, UploadRole::TestSpec) => Some(UploadType::XctestUiTestSpec),
        (TestType::AppiumNode, UploadRole::TestPackage) => Some(UploadType::AppiumNodeTestPackage),
        (TestType::AppiumNode, UploadRole::TestSpec) => Some(UploadType::AppiumNodeTestSpec),
        _ => None,
    }
}

/// Project and run name must be present
pub fn validate_identity(project_arn: &str, name: &str) -> FarmResult<()> {
    if project_arn.trim().is_empty() {
        return Err(FarmError::InvalidRunRequest("project is empty".to_string()));
    }
    if name.trim().is_empty() {
        return Err(FarmError::InvalidRunRequest("run name is empty".to_string()));
    }
    Ok(())
}

/// Everything needed to schedule one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub project_arn: String,
    /// `None` picks the project's first PRIVATE pool
    pub device_pool_arn: Option<String>,
    pub name: String,
    pub test_type: TestType,
    pub app: Option<RemoteJob>,
    pub test_package: Option<RemoteJob>,
    pub test_spec: Option<RemoteJob>,
}

impl RunRequest {
    pub fn new(project_arn: impl Into<String>, name: impl Into<String>, test_type: TestType) -> Self {
        Self {
            project_arn: project_arn.into(),
            device_pool_arn: None,
            name: name.into(),
            test_type,
            app: None,
            test_package: None,
            test_spec: None,
        }
    }

    pub fn with_device_pool(mut self, arn: impl Into<String>) -> Self {
        self.device_pool_arn = Some(arn.into());
        self
    }

    /// Attach an upload reference in `role`
    pub fn with_upload(mut self, role: UploadRole, job: RemoteJob) -> Self {
        *self.slot_mut(role) = Some(job);
        self
    }

    pub fn upload(&self, role: UploadRole) -> Option<&RemoteJob> {
        match role {
            UploadRole::AppPackage => self.app.as_ref(),
            UploadRole::TestPackage => self.test_package.as_ref(),
            UploadRole::TestSpec => self.test_spec.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: UploadRole) -> &mut Option<RemoteJob> {
        match role {
            UploadRole::AppPackage => &mut self.app,
            UploadRole::TestPackage => &mut self.test_package,
            UploadRole::TestSpec => &mut self.test_spec,
        }
    }

    /// Check the references against the test type's requirements
    pub fn validate(&self) -> FarmResult<()> {
        validate_identity(&self.project_arn, &self.name)?;

        let requirements = UploadRequirements::for_test_type(self.test_type);
        for role in [UploadRole::AppPackage, UploadRole::TestPackage, UploadRole::TestSpec] {
            match (requirements.get(role), self.upload(role)) {
                (Requirement::Required, None) => {
                    return Err(FarmError::InvalidRunRequest(format!(
                        "{} requires a {}",
                        self.test_type, role
                    )));
                }
                (Requirement::NotAccepted, Some(_)) => {
                    return Err(FarmError::InvalidRunRequest(format!(
                        "{} does not accept a {}",
                        self.test_type, role
                    )));
                }
                (_, Some(job)) if !job.is_upload() => {
                    return Err(FarmError::InvalidRunRequest(format!(
                        "{} reference {} is not an upload",
                        role, job.arn
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// A run accepted by the service
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub job: RemoteJob,
    /// Raw `schedule-run` response, the run record
    pub response: Value,
}

/// Submits run requests
pub struct RunScheduler {
    client: DeviceFarmClient,
    customer_artifact_ios_paths: Vec<String>,
}

impl RunScheduler {
    pub fn new(client: DeviceFarmClient, customer_artifact_ios_paths: Vec<String>) -> Self {
        Self {
            client,
            customer_artifact_ios_paths,
        }
    }

    /// Schedule a run and return its job reference
    pub fn schedule(&self, request: &RunRequest) -> FarmResult<RemoteJob> {
        self.submit(request).map(|scheduled| scheduled.job)
    }

    /// Schedule a run, keeping the raw response for a run record
    pub fn submit(&self, request: &RunRequest) -> FarmResult<ScheduledRun> {
        request.validate()?;

        let device_pool_arn = match &request.device_pool_arn {
            Some(arn) => arn.clone(),
            None => self.resolve_device_pool(&request.project_arn)?,
        };

        let api_request = ScheduleRunRequest {
            project_arn: request.project_arn.clone(),
            device_pool_arn,
            name: request.name.clone(),
            app_arn: request.app.as_ref().map(|j| j.arn.clone()),
            test: ScheduleRunTest {
                test_type: request.test_type,
                test_package_arn: request.test_package.as_ref().map(|j| j.arn.clone()),
                test_spec_arn: request.test_spec.as_ref().map(|j| j.arn.clone()),
            },
            configuration: ScheduleRunConfiguration::with_ios_paths(
                self.customer_artifact_ios_paths.clone(),
            ),
        };

        tracing::info!(name = %request.name, test_type = %request.test_type, pool = %api_request.device_pool_arn, "scheduling run");

        let response = self
            .client
            .schedule_run(&api_request)
            .map_err(|e| FarmError::api("schedule-run", e))?;
        let run = response.decoded.run;
        let job = RemoteJob::run(run.arn, run.status);

        tracing::info!(arn = %job.arn, status = %job.status, "run scheduled");
        Ok(ScheduledRun {
            job,
            response: response.raw,
        })
    }

    /// First PRIVATE device pool of the project
    pub fn resolve_device_pool(&self, project_arn: &str) -> FarmResult<String> {
        let pools = self
            .client
            .list_device_pools(project_arn)
            .map_err(|e| FarmError::api("list-device-pools", e))?;

        pools
            .first_of_type(DevicePoolType::Private)
            .map(|pool| {
                tracing::debug!(pool = %pool.name, arn = %pool.arn, "using device pool");
                pool.arn.clone()
            })
            .ok_or_else(|| FarmError::NoDevicePool {
                project: project_arn.to_string(),
            })
    }
}
