//! Mock Device Farm Service
//!
//! Scriptable in-process implementation of `ApiTransport`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use df_protocol::{
    upload_status, Artifact, Counters, DevicePool, Run, Upload, UploadType,
};
use serde_json::{json, Value};

use crate::host::{ApiCall, ApiTransport, TransportError};

use super::failure::{FailureConfig, FailureInjector};
use super::state::{project_id, MockRun, MockState, MockUpload, MOCK_ACCOUNT, MOCK_REGION};

/// Scriptable mock of the remote service
///
/// Cloning shares state, so a test can keep one handle for assertions and
/// give another to the code under test.
#[derive(Clone, Default)]
pub struct MockDeviceFarm {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
}

fn to_strings(statuses: &[&str]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

impl MockDeviceFarm {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn failures(&self) -> MutexGuard<'_, FailureInjector> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    // === Public API for test configuration ===

    /// Statuses reported by `get-upload` for uploads created from now on
    pub fn set_upload_progression(&self, statuses: &[&str]) {
        self.state().upload_progression = to_strings(statuses);
    }

    /// Statuses reported for uploads of one type, overriding the default
    pub fn set_upload_progression_for(&self, upload_type: UploadType, statuses: &[&str]) {
        self.state()
            .upload_progression_by_type
            .insert(upload_type, to_strings(statuses));
    }

    /// Statuses reported by `get-run` for runs scheduled from now on
    pub fn set_run_progression(&self, statuses: &[&str]) {
        self.state().run_progression = to_strings(statuses);
    }

    /// Counters reported once a run reaches the end of its progression
    pub fn set_run_counters(&self, counters: Counters) {
        self.state().run_counters = counters;
    }

    /// Artifacts listed for runs scheduled from now on
    pub fn set_run_artifacts(&self, artifacts: Vec<Artifact>) {
        self.state().run_artifacts = artifacts;
    }

    pub fn set_device_pools(&self, pools: Vec<DevicePool>) {
        self.state().device_pools = pools;
    }

    /// Register a run scheduled elsewhere (e.g. by an earlier process)
    pub fn insert_run(
        &self,
        arn: &str,
        statuses: &[&str],
        counters: Counters,
        artifacts: Vec<Artifact>,
    ) {
        let run = MockRun {
            run: Run {
                arn: arn.to_string(),
                name: Some("resumed".to_string()),
                status: "SCHEDULING".to_string(),
                result: None,
                counters: None,
                message: None,
            },
            progression: to_strings(statuses).into(),
            final_counters: counters,
            artifacts,
        };
        self.state().runs.insert(arn.to_string(), run);
    }

    /// Register an upload that has already finished processing
    ///
    /// Returns its ARN. Does not count as a call.
    pub fn seed_upload(&self, upload_type: UploadType) -> String {
        let mut state = self.state();
        let id = state.next_identifier();
        let project = state
            .projects
            .first()
            .map(|p| project_id(&p.arn).to_string())
            .unwrap_or_default();
        let arn = format!(
            "arn:aws:devicefarm:{}:{}:upload:{}/{}",
            MOCK_REGION, MOCK_ACCOUNT, project, id
        );
        let upload = Upload {
            arn: arn.clone(),
            name: Some(format!("seeded-{}", id)),
            upload_type: Some(upload_type),
            status: upload_status::SUCCEEDED.to_string(),
            url: None,
            message: None,
        };
        state.uploads.insert(
            arn.clone(),
            MockUpload {
                upload,
                progression: VecDeque::from(vec![upload_status::SUCCEEDED.to_string()]),
            },
        );
        arn
    }

    /// Inject a failure for an operation (`get-run`, `create-upload`, ...)
    pub fn inject_failure(&self, op: &'static str, config: FailureConfig) {
        self.failures().inject(op, config);
    }

    pub fn clear_failures(&self) {
        self.failures().clear();
    }

    // === Inspection ===

    /// Total number of calls received
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of calls received for one operation
    pub fn calls_for(&self, op: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn upload(&self, arn: &str) -> Option<Upload> {
        self.state().uploads.get(arn).map(|u| u.upload.clone())
    }

    pub fn run(&self, arn: &str) -> Option<Run> {
        self.state().runs.get(arn).map(|r| r.run.clone())
    }

    /// ARN of the first listed project
    pub fn project_arn(&self) -> String {
        self.state()
            .projects
            .first()
            .map(|p| p.arn.clone())
            .unwrap_or_default()
    }

    // === Operation handlers ===

    fn create_upload(
        state: &mut MockState,
        project_arn: &str,
        name: &str,
        upload_type: UploadType,
    ) -> Result<Value, TransportError> {
        let id = state.next_identifier();
        let arn = format!(
            "arn:aws:devicefarm:{}:{}:upload:{}/{}",
            MOCK_REGION,
            MOCK_ACCOUNT,
            project_id(project_arn),
            id
        );
        let progression = state
            .upload_progression_by_type
            .get(&upload_type)
            .unwrap_or(&state.upload_progression)
            .clone();

        let upload = Upload {
            arn: arn.clone(),
            name: Some(name.to_string()),
            upload_type: Some(upload_type),
            status: upload_status::INITIALIZED.to_string(),
            url: None,
            message: None,
        };
        let mut response = upload.clone();
        response.url = Some(format!(
            "https://mock-uploads.devicefarm.test/{}?X-Amz-Signature=mock",
            id
        ));

        state.uploads.insert(
            arn,
            MockUpload {
                upload,
                progression: VecDeque::from(progression),
            },
        );

        Ok(json!({ "upload": serde_json::to_value(&response)? }))
    }

    fn require_succeeded_upload(
        state: &MockState,
        arn: &str,
    ) -> Result<(), TransportError> {
        match state.uploads.get(arn) {
            Some(u) if u.upload.status == upload_status::SUCCEEDED => Ok(()),
            Some(u) => Err(TransportError::Rejected {
                operation: "schedule-run",
                message: format!("ArgumentException: upload {} is {}", arn, u.upload.status),
            }),
            None => Err(TransportError::Rejected {
                operation: "schedule-run",
                message: format!("NotFoundException: upload {} does not exist", arn),
            }),
        }
    }

    fn schedule_run(
        state: &mut MockState,
        project_arn: &str,
        name: &str,
        referenced: &[&String],
    ) -> Result<Value, TransportError> {
        for arn in referenced {
            Self::require_succeeded_upload(state, arn)?;
        }

        let id = state.next_identifier();
        let arn = format!(
            "arn:aws:devicefarm:{}:{}:run:{}/{}",
            MOCK_REGION,
            MOCK_ACCOUNT,
            project_id(project_arn),
            id
        );
        let run = Run {
            arn: arn.clone(),
            name: Some(name.to_string()),
            status: "SCHEDULING".to_string(),
            result: None,
            counters: None,
            message: None,
        };

        state.runs.insert(
            arn,
            MockRun {
                run: run.clone(),
                progression: VecDeque::from(state.run_progression.clone()),
                final_counters: state.run_counters,
                artifacts: state.run_artifacts.clone(),
            },
        );

        Ok(json!({ "run": serde_json::to_value(&run)? }))
    }

    fn not_found(operation: &'static str, arn: &str) -> TransportError {
        TransportError::Rejected {
            operation,
            message: format!("NotFoundException: {} does not exist", arn),
        }
    }

    fn handle(&self, call: &ApiCall) -> Result<Value, TransportError> {
        let mut state = self.state();
        state.calls.push(call.clone());

        match call {
            ApiCall::CreateUpload {
                project_arn,
                name,
                upload_type,
            } => Self::create_upload(&mut state, project_arn, name, *upload_type),
            ApiCall::GetUpload { arn } => {
                let upload = state
                    .uploads
                    .get_mut(arn)
                    .ok_or_else(|| Self::not_found("get-upload", arn))?
                    .advance();
                Ok(json!({ "upload": serde_json::to_value(upload)? }))
            }
            ApiCall::ScheduleRun {
                project_arn,
                name,
                app_arn,
                test,
                ..
            } => {
                let referenced: Vec<&String> = app_arn
                    .iter()
                    .chain(test.test_package_arn.iter())
                    .chain(test.test_spec_arn.iter())
                    .collect();
                Self::schedule_run(&mut state, project_arn, name, &referenced)
            }
            ApiCall::GetRun { arn } => {
                let run = state
                    .runs
                    .get_mut(arn)
                    .ok_or_else(|| Self::not_found("get-run", arn))?
                    .advance();
                Ok(json!({ "run": serde_json::to_value(run)? }))
            }
            ApiCall::ListArtifacts { arn, .. } => {
                let run = state
                    .runs
                    .get(arn)
                    .ok_or_else(|| Self::not_found("list-artifacts", arn))?;
                Ok(json!({ "artifacts": serde_json::to_value(&run.artifacts)? }))
            }
            ApiCall::ListDevicePools { .. } => {
                Ok(json!({ "devicePools": serde_json::to_value(&state.device_pools)? }))
            }
            ApiCall::ListProjects => Ok(json!({ "projects": serde_json::to_value(&state.projects)? })),
        }
    }
}

impl ApiTransport for MockDeviceFarm {
    fn call(&self, call: &ApiCall) -> Result<Value, TransportError> {
        let operation = call.operation();
        let (delay, failure) = {
            let mut failures = self.failures();
            let delay = failures.get_delay(operation);
            let failure = failures.check(operation).and_then(|c| c.message.clone());
            (delay, failure)
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        if let Some(message) = failure {
            self.state().calls.push(call.clone());
            return Err(TransportError::Command {
                operation,
                status: "exit status: 255".to_string(),
                stderr: message,
            });
        }

        self.handle(call)
    }
}
