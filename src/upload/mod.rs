//! Artifact uploads
//!
//! An upload is three steps: register it with `create-upload` (which returns
//! a one-time presigned URL), PUT the local bytes to that URL, then poll
//! `get-upload` until the service has processed the file. Only a
//! `SUCCEEDED` upload yields a job reference.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_protocol::{upload_status, UploadRole, UploadType};

use crate::error::{FarmError, FarmResult};
use crate::host::{ArtifactTransfer, DeviceFarmClient};
use crate::job::RemoteJob;
use crate::poller::{StatusPoller, StatusReport};
use crate::timeout::PollPolicy;

/// A local file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub upload_type: UploadType,
    pub project_arn: String,
}

impl UploadRequest {
    pub fn new(
        local_path: impl Into<PathBuf>,
        upload_type: UploadType,
        project_arn: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            upload_type,
            project_arn: project_arn.into(),
        }
    }

    /// Role the upload plays in a run, if it is one of the known types
    pub fn role(&self) -> Option<UploadRole> {
        self.upload_type.role()
    }

    /// Name registered with the service: the file name of the local path
    pub fn name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local_path.display().to_string())
    }
}

/// Drives uploads through transfer and processing
pub struct UploadManager {
    client: DeviceFarmClient,
    transfer: Arc<dyn ArtifactTransfer>,
    poller: StatusPoller,
    policy: PollPolicy,
}

impl UploadManager {
    pub fn new(
        client: DeviceFarmClient,
        transfer: Arc<dyn ArtifactTransfer>,
        poller: StatusPoller,
        policy: PollPolicy,
    ) -> Self {
        Self {
            client,
            transfer,
            poller,
            policy,
        }
    }

    /// Upload one file and wait until the service reports `SUCCEEDED`
    pub fn upload(&self, request: &UploadRequest) -> FarmResult<RemoteJob> {
        check_readable(&request.local_path)?;

        let name = request.name();
        tracing::info!(file = %request.local_path.display(), upload_type = %request.upload_type, "creating upload");

        let created = self
            .client
            .create_upload(&request.project_arn, &name, request.upload_type)
            .map_err(|e| FarmError::api("create-upload", e))?;
        let upload = created.decoded.upload;
        let mut job = RemoteJob::upload(upload.arn, upload.status);

        // create_upload guarantees the URL is present
        let url = upload.url.unwrap_or_default();
        let bytes = self
            .transfer
            .put_file(&url, &request.local_path)
            .map_err(|source| FarmError::ArtifactTransferFailed {
                what: request.local_path.display().to_string(),
                source,
            })?;
        tracing::debug!(arn = %job.arn, bytes, "upload transferred");

        let client = &self.client;
        self.poller.wait_for(
            &mut job,
            |arn| {
                client.get_upload(arn).map(|r| StatusReport {
                    status: r.decoded.upload.status,
                    payload: r.raw,
                })
            },
            &[upload_status::SUCCEEDED],
            &[upload_status::FAILED],
            &self.policy,
        )?;

        tracing::info!(arn = %job.arn, file = %name, "upload succeeded");
        Ok(job)
    }
}

fn check_readable(path: &Path) -> FarmResult<()> {
    let metadata = fs::metadata(path).map_err(|e| FarmError::io(path, e))?;
    if !metadata.is_file() {
        return Err(FarmError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    Ok(())
}
