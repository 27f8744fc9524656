//! Remote job handles
//!
//! A `RemoteJob` is the client's reference to an upload or run owned by the
//! remote service. It is created when a submission call succeeds and only
//! its status changes afterwards, through polling. The client never deletes
//! remote jobs; dropping the handle just forgets the reference.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a remote job reference names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// An uploaded app, test package or test spec
    Upload,
    /// A scheduled test run
    Run,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Upload => write!(f, "upload"),
            JobKind::Run => write!(f, "run"),
        }
    }
}

/// Client-side handle to a remote upload or run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteJob {
    /// Opaque resource identifier (ARN)
    pub arn: String,

    /// Upload or run
    pub kind: JobKind,

    /// Last status reported by the service
    pub status: String,
}

impl RemoteJob {
    /// Handle for a freshly submitted upload
    pub fn upload(arn: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            kind: JobKind::Upload,
            status: status.into(),
        }
    }

    /// Handle for a freshly scheduled run
    pub fn run(arn: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            kind: JobKind::Run,
            status: status.into(),
        }
    }

    /// Record a status observed by polling
    pub fn observe(&mut self, status: &str) {
        if self.status != status {
            tracing::debug!(arn = %self.arn, from = %self.status, to = %status, "{} status changed", self.kind);
            self.status = status.to_string();
        }
    }

    pub fn is_upload(&self) -> bool {
        self.kind == JobKind::Upload
    }

    pub fn is_run(&self) -> bool {
        self.kind == JobKind::Run
    }
}

impl fmt::Display for RemoteJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.arn, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        let upload = RemoteJob::upload("arn:upload", "INITIALIZED");
        assert!(upload.is_upload());
        assert!(!upload.is_run());

        let run = RemoteJob::run("arn:run", "PENDING");
        assert!(run.is_run());
        assert_eq!(run.kind, JobKind::Run);
    }

    #[test]
    fn test_observe_updates_status_only() {
        let mut job = RemoteJob::upload("arn:upload", "INITIALIZED");
        job.observe("PROCESSING");
        assert_eq!(job.status, "PROCESSING");
        assert_eq!(job.arn, "arn:upload");
        assert_eq!(job.kind, JobKind::Upload);
    }

    #[test]
    fn test_serialization_shape() {
        let job = RemoteJob::run("arn:run", "COMPLETED");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "run");
        assert_eq!(json["status"], "COMPLETED");
    }
}
