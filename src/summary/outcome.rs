//! Final result of a completed run

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use df_protocol::{Artifact, Counters, ProtocolError, Run};
use serde::{Deserialize, Serialize};

use super::exit::{ExitCode, OutcomeClass};

/// Outcome of a run that reached `COMPLETED`
///
/// Derived once from the final run payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_arn: String,

    /// Final run status as reported by the service
    pub status: String,

    /// Service-side result (`PASSED`, `FAILED`, `ERRORED`, ...), informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    pub class: OutcomeClass,

    pub counters: Counters,

    pub dashboard_url: String,

    /// Artifacts listed for the run
    #[serde(default)]
    pub artifact_manifest: Vec<Artifact>,

    /// Where the manifest was written, when collected to disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,

    /// Files downloaded for allow-listed artifact types
    #[serde(default)]
    pub downloaded: Vec<PathBuf>,

    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// Build from the final run payload
    ///
    /// A payload without counters cannot be classified.
    pub fn from_run(run: &Run, dashboard_url: String) -> Result<Self, ProtocolError> {
        let counters = run.counters.ok_or(ProtocolError::MissingField {
            what: "get-run",
            field: "run.counters",
        })?;
        Ok(Self {
            run_arn: run.arn.clone(),
            status: run.status.clone(),
            result: run.result.clone(),
            class: OutcomeClass::classify(&counters),
            counters,
            dashboard_url,
            artifact_manifest: Vec::new(),
            manifest_path: None,
            downloaded: Vec::new(),
            finished_at: Utc::now(),
        })
    }

    /// Counter buckets do not add up to `total`
    ///
    /// A reporting anomaly only; classification is unaffected.
    pub fn has_counter_anomaly(&self) -> bool {
        self.counters.is_inconsistent()
    }

    pub fn exit_code(&self, fail_on_error: bool) -> ExitCode {
        self.class.exit_code(fail_on_error)
    }

    /// Multi-line report for terminals
    pub fn human_summary(&self) -> String {
        let c = &self.counters;
        let mut lines = vec![
            format!("Run {} finished: {}", self.run_arn, self.class),
            format!(
                "  total={} passed={} failed={} errored={} stopped={} skipped={} warned={}",
                c.total, c.passed, c.failed, c.errored, c.stopped, c.skipped, c.warned
            ),
            format!("  dashboard: {}", self.dashboard_url),
        ];
        if let Some(path) = &self.manifest_path {
            lines.push(format!(
                "  artifacts: {} listed, {} downloaded, manifest {}",
                self.artifact_manifest.len(),
                self.downloaded.len(),
                path.display()
            ));
        }
        if self.has_counter_anomaly() {
            lines.push(format!(
                "  warning: counters sum to {} but total is {}",
                c.bucket_sum(),
                c.total
            ));
        }
        lines.join("\n")
    }
}
