//! Device Farm Protocol Types
//!
//! Wire types for the remote device-testing job API: uploads, runs,
//! device pools, projects and artifact listings. Field names follow the
//! service's camelCase JSON; unknown fields are ignored.

pub mod artifact;
pub mod error;
pub mod pool;
pub mod run;
pub mod upload;

pub use artifact::{Artifact, ArtifactCategory, ArtifactType, ListArtifactsResponse};
pub use error::{decode, ProtocolError};
pub use pool::{DevicePool, DevicePoolType, ListDevicePoolsResponse, ListProjectsResponse, Project};
pub use run::{
    Counters, CustomerArtifactPaths, GetRunResponse, Run, ScheduleRunConfiguration,
    ScheduleRunResponse, ScheduleRunTest, TestType,
};
pub use upload::{CreateUploadResponse, GetUploadResponse, Upload, UploadRole, UploadType};

/// Upload status values reported by the service.
pub mod upload_status {
    pub const INITIALIZED: &str = "INITIALIZED";
    pub const PROCESSING: &str = "PROCESSING";
    pub const SUCCEEDED: &str = "SUCCEEDED";
    pub const FAILED: &str = "FAILED";
}

/// Run status values reported by the service.
///
/// There is no failure status for runs: a run with failing tests still
/// ends in `COMPLETED`.
pub mod run_status {
    pub const PENDING: &str = "PENDING";
    pub const PENDING_CONCURRENCY: &str = "PENDING_CONCURRENCY";
    pub const PENDING_DEVICE: &str = "PENDING_DEVICE";
    pub const PROCESSING: &str = "PROCESSING";
    pub const SCHEDULING: &str = "SCHEDULING";
    pub const PREPARING: &str = "PREPARING";
    pub const RUNNING: &str = "RUNNING";
    pub const COMPLETED: &str = "COMPLETED";
    pub const STOPPING: &str = "STOPPING";
}
