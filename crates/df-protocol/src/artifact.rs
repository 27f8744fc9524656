//! Artifact listing types.

use serde::{Deserialize, Serialize};

/// Artifact category filter for `list-artifacts --type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactCategory {
    File,
    Log,
    Screenshot,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "FILE",
            Self::Log => "LOG",
            Self::Screenshot => "SCREENSHOT",
        }
    }
}

/// Artifact type as reported in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactType {
    /// Files pulled from the customer artifact paths on the device.
    CustomerArtifact,
    /// Log of the customer artifact collection.
    CustomerArtifactLog,
    ApplicationCrashReport,
    /// Output of the test spec host commands.
    TestspecOutput,
    DeviceLog,
    RawFile,
    Video,
    #[serde(other)]
    Other,
}

/// One entry of a `list-artifacts` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub arn: String,
    pub name: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub extension: String,
    /// Presigned download URL.
    pub url: String,
}

/// `list-artifacts` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListArtifactsResponse {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}
