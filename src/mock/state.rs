//! Mock Service State Management
//!
//! Tracks uploads, runs, artifact listings and call history for the mock
//! service.

use std::collections::{HashMap, VecDeque};

use df_protocol::{
    upload_status, Artifact, Counters, DevicePool, DevicePoolType, Project, Run, Upload,
    UploadType,
};

use crate::host::ApiCall;

/// Region embedded in generated ARNs
pub const MOCK_REGION: &str = "us-west-2";

/// Account embedded in generated ARNs
pub const MOCK_ACCOUNT: &str = "111122223333";

/// An upload and the statuses it will report next
#[derive(Debug, Clone)]
pub struct MockUpload {
    pub upload: Upload,
    /// Statuses returned by successive `get-upload` calls; the last one sticks
    pub progression: VecDeque<String>,
}

impl MockUpload {
    /// Advance one step and return the status now reported
    pub fn advance(&mut self) -> &Upload {
        if self.progression.len() > 1 {
            if let Some(next) = self.progression.pop_front() {
                self.upload.status = next;
            }
        } else if let Some(last) = self.progression.front() {
            self.upload.status = last.clone();
        }
        &self.upload
    }
}

/// A run and the statuses it will report next
#[derive(Debug, Clone)]
pub struct MockRun {
    pub run: Run,
    /// Statuses returned by successive `get-run` calls; the last one sticks
    pub progression: VecDeque<String>,
    /// Counters reported once the progression is exhausted
    pub final_counters: Counters,
    /// Artifacts listed for this run
    pub artifacts: Vec<Artifact>,
}

impl MockRun {
    /// Advance one step and return the run as now reported
    pub fn advance(&mut self) -> &Run {
        if self.progression.len() > 1 {
            if let Some(next) = self.progression.pop_front() {
                self.run.status = next;
            }
            self.run.counters = Some(Counters::default());
        } else {
            if let Some(last) = self.progression.front() {
                self.run.status = last.clone();
            }
            self.run.counters = Some(self.final_counters);
        }
        &self.run
    }
}

/// Mutable state of the mock service
#[derive(Debug)]
pub struct MockState {
    pub uploads: HashMap<String, MockUpload>,
    pub runs: HashMap<String, MockRun>,
    /// Progression given to uploads created from now on
    pub upload_progression: Vec<String>,
    /// Per-type progression overrides
    pub upload_progression_by_type: HashMap<UploadType, Vec<String>>,
    /// Progression given to runs scheduled from now on
    pub run_progression: Vec<String>,
    /// Counters given to runs scheduled from now on
    pub run_counters: Counters,
    /// Artifacts given to runs scheduled from now on
    pub run_artifacts: Vec<Artifact>,
    pub device_pools: Vec<DevicePool>,
    pub projects: Vec<Project>,
    /// Every call received, in order
    pub calls: Vec<ApiCall>,
    next_id: u64,
}

impl MockState {
    pub fn new() -> Self {
        let project_arn = project_arn("0b153413-cf67-4192-9ae3-fbe93cda6ea2");
        Self {
            uploads: HashMap::new(),
            runs: HashMap::new(),
            upload_progression: vec![
                upload_status::PROCESSING.to_string(),
                upload_status::SUCCEEDED.to_string(),
            ],
            upload_progression_by_type: HashMap::new(),
            run_progression: vec!["RUNNING".to_string(), "COMPLETED".to_string()],
            run_counters: Counters {
                total: 1,
                passed: 1,
                ..Counters::default()
            },
            run_artifacts: Vec::new(),
            device_pools: vec![
                DevicePool {
                    arn: format!("arn:aws:devicefarm:{}::devicepool:top-devices", MOCK_REGION),
                    name: "Top Devices".to_string(),
                    pool_type: DevicePoolType::Curated,
                    description: None,
                },
                DevicePool {
                    arn: format!(
                        "arn:aws:devicefarm:{}:{}:devicepool:0b153413/private-iphones",
                        MOCK_REGION, MOCK_ACCOUNT
                    ),
                    name: "iPhones".to_string(),
                    pool_type: DevicePoolType::Private,
                    description: None,
                },
            ],
            projects: vec![Project {
                arn: project_arn,
                name: "Maps SDK".to_string(),
            }],
            calls: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a UUID-shaped identifier
    pub fn next_identifier(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("{:08x}-0000-4000-8000-{:012x}", id, id)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

/// Project ARN for a project identifier
pub fn project_arn(project_id: &str) -> String {
    format!(
        "arn:aws:devicefarm:{}:{}:project:{}",
        MOCK_REGION, MOCK_ACCOUNT, project_id
    )
}

/// Project identifier embedded in a project ARN
pub fn project_id(project_arn: &str) -> &str {
    project_arn
        .rsplit_once(":project:")
        .map(|(_, id)| id)
        .unwrap_or(project_arn)
}
