use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_protocol::{Artifact, ArtifactCategory, ArtifactType};

use super::sanitize::{artifact_file_name, fs_token};
use crate::error::{FarmError, FarmResult};
use crate::host::{ArtifactTransfer, DeviceFarmClient};
use crate::signal::CancelToken;

/// Name of the listing written next to the downloads
pub const MANIFEST_FILE: &str = "list-artifacts.json";

/// Artifact types downloaded when collecting to disk
pub const COLLECTED_TYPES: &[ArtifactType] = &[
    ArtifactType::CustomerArtifact,
    ArtifactType::CustomerArtifactLog,
    ArtifactType::ApplicationCrashReport,
    ArtifactType::TestspecOutput,
];

pub fn is_collected(artifact_type: ArtifactType) -> bool {
    COLLECTED_TYPES.contains(&artifact_type)
}

/// What a collection produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    /// Every file artifact listed for the run
    pub artifacts: Vec<Artifact>,
    pub manifest_path: Option<PathBuf>,
    pub downloaded: Vec<PathBuf>,
}

/// Lists and downloads run artifacts
pub struct ArtifactCollector {
    client: DeviceFarmClient,
    transfer: Arc<dyn ArtifactTransfer>,
    cancel: CancelToken,
}

impl ArtifactCollector {
    pub fn new(
        client: DeviceFarmClient,
        transfer: Arc<dyn ArtifactTransfer>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            client,
            transfer,
            cancel,
        }
    }

    /// Directory that holds everything collected for `run_arn`
    pub fn run_dir(destination: &Path, run_arn: &str) -> PathBuf {
        destination.join(fs_token(run_arn))
    }

    /// Download path of one artifact
    pub fn artifact_path(destination: &Path, run_arn: &str, artifact: &Artifact) -> PathBuf {
        Self::run_dir(destination, run_arn)
            .join(fs_token(&artifact.arn))
            .join(artifact_file_name(&artifact.name, &artifact.extension))
    }

    /// List the run's file artifacts, downloading to `destination` if given
    ///
    /// The first failed download aborts the collection.
    pub fn collect(&self, run_arn: &str, destination: Option<&Path>) -> FarmResult<Collection> {
        let listing = self
            .client
            .list_artifacts(run_arn, ArtifactCategory::File)
            .map_err(|e| FarmError::api("list-artifacts", e))?;
        let artifacts = listing.decoded.artifacts;
        tracing::info!(arn = %run_arn, count = artifacts.len(), "listed artifacts");

        let destination = match destination {
            Some(d) => d,
            None => {
                return Ok(Collection {
                    artifacts,
                    ..Collection::default()
                })
            }
        };

        let run_dir = Self::run_dir(destination, run_arn);
        fs::create_dir_all(&run_dir).map_err(|e| FarmError::io(&run_dir, e))?;

        // serde_json::Value keeps object keys sorted
        let manifest_path = run_dir.join(MANIFEST_FILE);
        let manifest = serde_json::to_string_pretty(&listing.raw)?;
        fs::write(&manifest_path, manifest).map_err(|e| FarmError::io(&manifest_path, e))?;

        let mut downloaded = Vec::new();
        for artifact in artifacts.iter().filter(|a| is_collected(a.artifact_type)) {
            if self.cancel.is_cancelled() {
                return Err(FarmError::Cancelled {
                    job: run_arn.to_string(),
                    last: None,
                });
            }

            let path = Self::artifact_path(destination, run_arn, artifact);
            let bytes = self
                .transfer
                .download(&artifact.url, &path)
                .map_err(|source| FarmError::ArtifactTransferFailed {
                    what: format!("{} ({})", artifact.name, artifact.arn),
                    source,
                })?;
            tracing::debug!(path = %path.display(), bytes, "downloaded artifact");
            downloaded.push(path);
        }

        tracing::info!(
            manifest = %manifest_path.display(),
            downloaded = downloaded.len(),
            "collected artifacts"
        );

        Ok(Collection {
            artifacts,
            manifest_path: Some(manifest_path),
            downloaded,
        })
    }
}
