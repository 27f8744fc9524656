//! Transport Layer for the Remote Job API
//!
//! Abstracts how API calls reach the service. Provides:
//! - ApiTransport trait: one synchronous request/response per call
//! - AwsCliTransport: runs the vendor CLI as a child process
//!
//! The in-process fake lives in `crate::mock`.

use std::io;
use std::process::{Command, Stdio};

use df_protocol::{ArtifactCategory, ScheduleRunConfiguration, ScheduleRunTest, UploadType};
use serde_json::Value;

/// One call against the remote job API
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateUpload {
        project_arn: String,
        name: String,
        upload_type: UploadType,
    },
    GetUpload {
        arn: String,
    },
    ScheduleRun {
        project_arn: String,
        device_pool_arn: String,
        name: String,
        app_arn: Option<String>,
        test: ScheduleRunTest,
        configuration: ScheduleRunConfiguration,
    },
    GetRun {
        arn: String,
    },
    ListArtifacts {
        arn: String,
        category: ArtifactCategory,
    },
    ListDevicePools {
        project_arn: String,
    },
    ListProjects,
}

impl ApiCall {
    /// Operation name, as understood by the vendor CLI
    pub fn operation(&self) -> &'static str {
        match self {
            ApiCall::CreateUpload { .. } => "create-upload",
            ApiCall::GetUpload { .. } => "get-upload",
            ApiCall::ScheduleRun { .. } => "schedule-run",
            ApiCall::GetRun { .. } => "get-run",
            ApiCall::ListArtifacts { .. } => "list-artifacts",
            ApiCall::ListDevicePools { .. } => "list-device-pools",
            ApiCall::ListProjects => "list-projects",
        }
    }

    /// True for the read-only status queries used by polling
    pub fn is_status_query(&self) -> bool {
        matches!(self, ApiCall::GetUpload { .. } | ApiCall::GetRun { .. })
    }
}

/// Transport trait for remote API calls
pub trait ApiTransport: Send + Sync {
    /// Execute a call and return the raw JSON response body
    fn call(&self, call: &ApiCall) -> Result<Value, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{operation} failed ({status}): {stderr}")]
    Command {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    #[error("{operation} returned invalid JSON: {source}")]
    InvalidJson {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("service rejected {operation}: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
}

/// Vendor CLI configuration
#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    /// Executable name or path
    pub program: String,
    /// Region passed to every call
    pub region: String,
    /// Optional named credentials profile
    pub profile: Option<String>,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
            region: "us-west-2".to_string(),
            profile: None,
        }
    }
}

/// Remote API over the vendor CLI
///
/// Each call spawns `<program> devicefarm <operation> ...` and parses its
/// stdout as a single JSON document.
pub struct AwsCliTransport {
    config: AwsCliConfig,
}

impl AwsCliTransport {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    /// Build the CLI argument vector for a call
    pub fn build_args(&self, call: &ApiCall) -> Result<Vec<String>, TransportError> {
        let mut args = vec!["devicefarm".to_string(), call.operation().to_string()];

        match call {
            ApiCall::CreateUpload {
                project_arn,
                name,
                upload_type,
            } => {
                args.extend([
                    "--project-arn".to_string(),
                    project_arn.clone(),
                    "--name".to_string(),
                    name.clone(),
                    "--type".to_string(),
                    upload_type.as_str().to_string(),
                ]);
            }
            ApiCall::GetUpload { arn } | ApiCall::GetRun { arn } => {
                args.extend(["--arn".to_string(), arn.clone()]);
            }
            ApiCall::ScheduleRun {
                project_arn,
                device_pool_arn,
                name,
                app_arn,
                test,
                configuration,
            } => {
                args.extend([
                    "--project-arn".to_string(),
                    project_arn.clone(),
                    "--device-pool-arn".to_string(),
                    device_pool_arn.clone(),
                    "--name".to_string(),
                    name.clone(),
                    "--test".to_string(),
                    serde_json::to_string(test)?,
                    "--configuration".to_string(),
                    serde_json::to_string(configuration)?,
                ]);
                if let Some(app) = app_arn {
                    args.extend(["--app-arn".to_string(), app.clone()]);
                }
            }
            ApiCall::ListArtifacts { arn, category } => {
                args.extend([
                    "--arn".to_string(),
                    arn.clone(),
                    "--type".to_string(),
                    category.as_str().to_string(),
                ]);
            }
            ApiCall::ListDevicePools { project_arn } => {
                args.extend(["--arn".to_string(), project_arn.clone()]);
            }
            ApiCall::ListProjects => {
                args.push("--no-paginate".to_string());
            }
        }

        args.extend(["--region".to_string(), self.config.region.clone()]);
        if let Some(ref profile) = self.config.profile {
            args.extend(["--profile".to_string(), profile.clone()]);
        }
        args.extend(["--output".to_string(), "json".to_string()]);

        Ok(args)
    }
}

impl ApiTransport for AwsCliTransport {
    fn call(&self, call: &ApiCall) -> Result<Value, TransportError> {
        let args = self.build_args(call)?;
        let operation = call.operation();

        tracing::debug!(operation, program = %self.config.program, "invoking remote API");

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| TransportError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransportError::Command {
                operation,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|source| TransportError::InvalidJson { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use df_protocol::TestType;

    fn transport() -> AwsCliTransport {
        AwsCliTransport::new(AwsCliConfig::default())
    }

    #[test]
    fn test_get_run_args() {
        let args = transport()
            .build_args(&ApiCall::GetRun {
                arn: "arn:run".to_string(),
            })
            .unwrap();
        assert_eq!(
            args,
            vec![
                "devicefarm", "get-run", "--arn", "arn:run", "--region", "us-west-2", "--output",
                "json"
            ]
        );
    }

    #[test]
    fn test_create_upload_args() {
        let args = transport()
            .build_args(&ApiCall::CreateUpload {
                project_arn: "arn:project".to_string(),
                name: "App.ipa".to_string(),
                upload_type: UploadType::IosApp,
            })
            .unwrap();
        assert!(args.windows(2).any(|w| w == ["--type", "IOS_APP"]));
        assert!(args.windows(2).any(|w| w == ["--name", "App.ipa"]));
    }

    #[test]
    fn test_schedule_run_args_json_structures() {
        let args = transport()
            .build_args(&ApiCall::ScheduleRun {
                project_arn: "arn:project".to_string(),
                device_pool_arn: "arn:pool".to_string(),
                name: "Unit Tests".to_string(),
                app_arn: Some("arn:app".to_string()),
                test: ScheduleRunTest {
                    test_type: TestType::Xctest,
                    test_package_arn: Some("arn:pkg".to_string()),
                    test_spec_arn: None,
                },
                configuration: ScheduleRunConfiguration::with_ios_paths(vec![
                    "Documents".to_string()
                ]),
            })
            .unwrap();

        let test_pos = args.iter().position(|a| a == "--test").unwrap();
        assert_eq!(args[test_pos + 1], r#"{"type":"XCTEST","testPackageArn":"arn:pkg"}"#);
        assert!(args.windows(2).any(|w| w == ["--app-arn", "arn:app"]));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "--configuration" && w[1].contains("iosPaths")));
    }

    #[test]
    fn test_profile_is_forwarded() {
        let transport = AwsCliTransport::new(AwsCliConfig {
            profile: Some("ci".to_string()),
            ..AwsCliConfig::default()
        });
        let args = transport.build_args(&ApiCall::ListProjects).unwrap();
        assert!(args.windows(2).any(|w| w == ["--profile", "ci"]));
        assert!(args.contains(&"--no-paginate".to_string()));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let transport = AwsCliTransport::new(AwsCliConfig {
            program: "/nonexistent/devicefarm-cli".to_string(),
            ..AwsCliConfig::default()
        });
        let result = transport.call(&ApiCall::ListProjects);
        assert!(matches!(result, Err(TransportError::Spawn { .. })));
    }

    #[test]
    fn test_status_query_classification() {
        assert!(ApiCall::GetUpload { arn: "a".to_string() }.is_status_query());
        assert!(ApiCall::GetRun { arn: "a".to_string() }.is_status_query());
        assert!(!ApiCall::ListProjects.is_status_query());
    }
}
