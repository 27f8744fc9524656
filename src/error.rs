//! Orchestration errors
//!
//! Upload and scheduling failures abort the invocation with one of these.
//! Run monitoring never returns them to callers; it folds them into a
//! terminal `MonitorResult` instead.

use std::io;
use std::path::Path;
use std::time::Duration;

use df_protocol::ProtocolError;
use serde_json::Value;

use crate::host::{ApiError, TransferError};
use crate::poller::StatusSnapshot;

/// Orchestration errors
#[derive(Debug, thiserror::Error)]
pub enum FarmError {
    /// A status query failed (network, credentials, service error)
    #[error("status query for {job} failed on tick {tick}: {source}")]
    RemoteQuery {
        job: String,
        tick: u32,
        #[source]
        source: ApiError,
        last: Option<Box<StatusSnapshot>>,
    },

    /// The service reported a terminal failure status
    #[error("{job} reached failure status {status}")]
    RemoteJobFailed {
        job: String,
        status: String,
        snapshot: Box<StatusSnapshot>,
    },

    #[error("{job} did not reach a terminal status within {timeout:?}")]
    PollTimeout {
        job: String,
        timeout: Duration,
        last: Box<StatusSnapshot>,
    },

    #[error("cancelled while waiting for {job}")]
    Cancelled {
        job: String,
        last: Option<Box<StatusSnapshot>>,
    },

    /// A completed run's payload lacks what classification needs
    #[error("{job} completed without a usable result: {source}")]
    IncompleteResult {
        job: String,
        #[source]
        source: ProtocolError,
        snapshot: Box<StatusSnapshot>,
    },

    /// Moving bytes to or from a presigned URL failed
    #[error("transfer of {what} failed: {source}")]
    ArtifactTransferFailed {
        what: String,
        #[source]
        source: TransferError,
    },

    /// Local precondition violation, detected before any network call
    #[error("invalid run request: {0}")]
    InvalidRunRequest(String),

    #[error("malformed job reference: {0}")]
    MalformedJobReference(String),

    /// A submission or listing call failed
    #[error("{operation} failed: {source}")]
    Api {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("no PRIVATE device pool in project {project}")]
    NoDevicePool { project: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestration operations
pub type FarmResult<T> = Result<T, FarmError>;

impl FarmError {
    pub(crate) fn api(operation: &'static str, source: ApiError) -> Self {
        Self::Api { operation, source }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Last status snapshot known when the error happened
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            FarmError::RemoteQuery { last, .. } | FarmError::Cancelled { last, .. } => {
                last.as_deref()
            }
            FarmError::RemoteJobFailed { snapshot, .. }
            | FarmError::IncompleteResult { snapshot, .. } => Some(&**snapshot),
            FarmError::PollTimeout { last, .. } => Some(&**last),
            _ => None,
        }
    }

    /// Raw status JSON to print before terminating
    pub fn diagnostic_payload(&self) -> Option<&Value> {
        self.snapshot().map(|s| &s.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            status: "PROCESSING".to_string(),
            payload: json!({"upload": {"status": "PROCESSING"}}),
            tick: 20,
            elapsed: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_timeout_exposes_payload() {
        let err = FarmError::PollTimeout {
            job: "arn:upload".to_string(),
            timeout: Duration::from_secs(300),
            last: Box::new(snapshot()),
        };
        assert_eq!(
            err.diagnostic_payload(),
            Some(&json!({"upload": {"status": "PROCESSING"}}))
        );
    }

    #[test]
    fn test_local_errors_have_no_payload() {
        let err = FarmError::InvalidRunRequest("XCTEST_UI requires a test spec".to_string());
        assert!(err.diagnostic_payload().is_none());
        assert_eq!(
            err.to_string(),
            "invalid run request: XCTEST_UI requires a test spec"
        );
    }

    #[test]
    fn test_cancelled_before_first_tick_has_no_payload() {
        let err = FarmError::Cancelled {
            job: "arn:run".to_string(),
            last: None,
        };
        assert!(err.snapshot().is_none());
    }
}
