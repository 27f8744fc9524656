//! Typed Remote Job API Client
//!
//! Wraps an `ApiTransport` and decodes responses into `df-protocol` types.
//! Status queries also return the raw JSON body so callers can keep it for
//! diagnostics and result files.

use std::sync::Arc;

use df_protocol::{
    decode, ArtifactCategory, CreateUploadResponse, GetRunResponse, GetUploadResponse,
    ListArtifactsResponse, ListDevicePoolsResponse, ListProjectsResponse, ProtocolError,
    ScheduleRunConfiguration, ScheduleRunResponse, ScheduleRunTest, UploadType,
};
use serde_json::Value;

use super::transport::{ApiCall, ApiTransport, TransportError};

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Arguments of `schedule-run`
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRunRequest {
    pub project_arn: String,
    pub device_pool_arn: String,
    pub name: String,
    pub app_arn: Option<String>,
    pub test: ScheduleRunTest,
    pub configuration: ScheduleRunConfiguration,
}

/// Decoded response paired with the raw body it came from
#[derive(Debug, Clone)]
pub struct WithRaw<T> {
    pub decoded: T,
    pub raw: Value,
}

/// Typed client for the remote job API
#[derive(Clone)]
pub struct DeviceFarmClient {
    transport: Arc<dyn ApiTransport>,
}

impl DeviceFarmClient {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    fn execute<T: serde::de::DeserializeOwned>(
        &self,
        what: &'static str,
        call: ApiCall,
    ) -> ApiResult<WithRaw<T>> {
        let raw = self.transport.call(&call)?;
        let decoded = decode(what, &raw)?;
        Ok(WithRaw { decoded, raw })
    }

    /// Register an upload; the response carries the presigned PUT URL
    pub fn create_upload(
        &self,
        project_arn: &str,
        name: &str,
        upload_type: UploadType,
    ) -> ApiResult<WithRaw<CreateUploadResponse>> {
        let response: WithRaw<CreateUploadResponse> = self.execute(
            "create-upload",
            ApiCall::CreateUpload {
                project_arn: project_arn.to_string(),
                name: name.to_string(),
                upload_type,
            },
        )?;

        if response.decoded.upload.url.is_none() {
            return Err(ProtocolError::MissingField {
                what: "create-upload",
                field: "upload.url",
            }
            .into());
        }

        Ok(response)
    }

    pub fn get_upload(&self, arn: &str) -> ApiResult<WithRaw<GetUploadResponse>> {
        self.execute(
            "get-upload",
            ApiCall::GetUpload {
                arn: arn.to_string(),
            },
        )
    }

    pub fn schedule_run(
        &self,
        request: &ScheduleRunRequest,
    ) -> ApiResult<WithRaw<ScheduleRunResponse>> {
        self.execute(
            "schedule-run",
            ApiCall::ScheduleRun {
                project_arn: request.project_arn.clone(),
                device_pool_arn: request.device_pool_arn.clone(),
                name: request.name.clone(),
                app_arn: request.app_arn.clone(),
                test: request.test.clone(),
                configuration: request.configuration.clone(),
            },
        )
    }

    pub fn get_run(&self, arn: &str) -> ApiResult<WithRaw<GetRunResponse>> {
        self.execute(
            "get-run",
            ApiCall::GetRun {
                arn: arn.to_string(),
            },
        )
    }

    pub fn list_artifacts(
        &self,
        run_arn: &str,
        category: ArtifactCategory,
    ) -> ApiResult<WithRaw<ListArtifactsResponse>> {
        self.execute(
            "list-artifacts",
            ApiCall::ListArtifacts {
                arn: run_arn.to_string(),
                category,
            },
        )
    }

    pub fn list_device_pools(&self, project_arn: &str) -> ApiResult<ListDevicePoolsResponse> {
        self.execute(
            "list-device-pools",
            ApiCall::ListDevicePools {
                project_arn: project_arn.to_string(),
            },
        )
        .map(|r| r.decoded)
    }

    pub fn list_projects(&self) -> ApiResult<ListProjectsResponse> {
        self.execute("list-projects", ApiCall::ListProjects)
            .map(|r| r.decoded)
    }
}
