//! Run monitoring
//!
//! Polls a scheduled run until `COMPLETED`, classifies the counters and
//! collects artifacts. Whatever goes wrong along the way, `monitor` returns a
//! terminal `MonitorResult`; it never hands an error to the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use df_protocol::{run_status, Run};
use regex_lite::Regex;
use serde_json::{json, Value};

use crate::artifact::ArtifactCollector;
use crate::error::{FarmError, FarmResult};
use crate::host::DeviceFarmClient;
use crate::job::RemoteJob;
use crate::poller::{StatusPoller, StatusReport};
use crate::summary::{ExitCode, OutcomeClass, RunOutcome};
use crate::timeout::PollPolicy;

/// `...:run:<project-id>/<run-id>`
const RUN_ARN_PATTERN: &str = r":run:([^/:\s]+)/([^/:\s]+)$";

/// Compiled once per process
fn run_arn_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RUN_ARN_PATTERN).ok()).as_ref()
}

/// Console URL of a run
///
/// Fails with `MalformedJobReference` unless `run_arn` ends in
/// `:run:<project-id>/<run-id>`.
pub fn dashboard_url(run_arn: &str, region: &str) -> FarmResult<String> {
    let caps = run_arn_regex()
        .and_then(|re| re.captures(run_arn))
        .ok_or_else(|| FarmError::MalformedJobReference(run_arn.to_string()))?;

    Ok(format!(
        "https://{region}.console.aws.amazon.com/devicefarm/home?region={region}#/projects/{}/runs/{}",
        &caps[1],
        &caps[2],
        region = region
    ))
}

/// Terminal result of monitoring one run
#[derive(Debug)]
pub enum MonitorResult {
    /// The run completed; the outcome says how well
    Finished(RunOutcome),
    /// Monitoring failed before an outcome could be derived
    ErroredWithException { run_arn: String, error: FarmError },
}

impl MonitorResult {
    pub fn class(&self) -> OutcomeClass {
        match self {
            MonitorResult::Finished(outcome) => outcome.class,
            MonitorResult::ErroredWithException { .. } => OutcomeClass::ErroredWithException,
        }
    }

    pub fn exit_code(&self, fail_on_error: bool) -> ExitCode {
        self.class().exit_code(fail_on_error)
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match self {
            MonitorResult::Finished(outcome) => Some(outcome),
            MonitorResult::ErroredWithException { .. } => None,
        }
    }

    pub fn run_arn(&self) -> &str {
        match self {
            MonitorResult::Finished(outcome) => &outcome.run_arn,
            MonitorResult::ErroredWithException { run_arn, .. } => run_arn,
        }
    }

    /// JSON report: the outcome, or the error with its last known payload
    pub fn to_json(&self) -> FarmResult<Value> {
        match self {
            MonitorResult::Finished(outcome) => Ok(serde_json::to_value(outcome)?),
            MonitorResult::ErroredWithException { run_arn, error } => Ok(json!({
                "run_arn": run_arn,
                "class": OutcomeClass::ErroredWithException,
                "error": error.to_string(),
                "last_payload": error.diagnostic_payload(),
            })),
        }
    }
}

/// Polls runs to completion and derives their outcome
pub struct RunMonitor {
    client: DeviceFarmClient,
    collector: ArtifactCollector,
    poller: StatusPoller,
    interval: Duration,
    region: String,
    artifact_dir: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl RunMonitor {
    pub fn new(
        client: DeviceFarmClient,
        collector: ArtifactCollector,
        poller: StatusPoller,
        interval: Duration,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client,
            collector,
            poller,
            interval,
            region: region.into(),
            artifact_dir: None,
            output_file: None,
        }
    }

    /// Download allow-listed artifacts under `dir`
    pub fn with_artifact_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.artifact_dir = dir;
        self
    }

    /// Write the final `get-run` payload to `path`
    pub fn with_output_file(mut self, path: Option<PathBuf>) -> Self {
        self.output_file = path;
        self
    }

    /// Monitor `job` to a terminal result
    pub fn monitor(&self, job: &mut RemoteJob, timeout: Option<Duration>) -> MonitorResult {
        match self.try_monitor(job, timeout) {
            Ok(outcome) => MonitorResult::Finished(outcome),
            Err(error) => {
                tracing::error!(arn = %job.arn, error = %error, "monitoring failed");
                MonitorResult::ErroredWithException {
                    run_arn: job.arn.clone(),
                    error,
                }
            }
        }
    }

    fn try_monitor(&self, job: &mut RemoteJob, timeout: Option<Duration>) -> FarmResult<RunOutcome> {
        if !job.is_run() {
            return Err(FarmError::MalformedJobReference(format!(
                "{} is not a run",
                job.arn
            )));
        }
        let dashboard = dashboard_url(&job.arn, &self.region)?;
        tracing::info!(arn = %job.arn, dashboard = %dashboard, "monitoring run");

        let policy = PollPolicy::new(self.interval, timeout);
        let client = &self.client;
        let mut last_run: Option<Run> = None;

        let snapshot = self.poller.wait_for(
            job,
            |arn| {
                let response = client.get_run(arn)?;
                let run = response.decoded.run;
                let status = run.status.clone();
                last_run = Some(run);
                Ok(StatusReport {
                    status,
                    payload: response.raw,
                })
            },
            &[run_status::COMPLETED],
            &[],
            &policy,
        )?;

        if let Some(path) = &self.output_file {
            write_json(path, &snapshot.payload)?;
        }

        let run = last_run.ok_or_else(|| {
            FarmError::MalformedJobReference(format!("no run payload for {}", job.arn))
        })?;
        let mut outcome = RunOutcome::from_run(&run, dashboard).map_err(|source| {
            FarmError::IncompleteResult {
                job: job.arn.clone(),
                source,
                snapshot: Box::new(snapshot.clone()),
            }
        })?;
        if outcome.has_counter_anomaly() {
            tracing::warn!(
                arn = %outcome.run_arn,
                total = outcome.counters.total,
                sum = outcome.counters.bucket_sum(),
                "run counters do not add up to total"
            );
        }

        let collection = self
            .collector
            .collect(&job.arn, self.artifact_dir.as_deref())?;
        outcome.artifact_manifest = collection.artifacts;
        outcome.manifest_path = collection.manifest_path;
        outcome.downloaded = collection.downloaded;

        tracing::info!(arn = %outcome.run_arn, class = %outcome.class, "run finished");
        Ok(outcome)
    }
}

/// Write pretty JSON, creating parent directories
pub(crate) fn write_json(path: &Path, value: &Value) -> FarmResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FarmError::io(parent, e))?;
    }
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| FarmError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailureConfig, MockDeviceFarm, MockTransfer};
    use crate::signal::CancelToken;
    use df_protocol::Counters;
    use std::sync::Arc;

    const RUN: &str = "arn:aws:devicefarm:us-west-2:111122223333:run:PPPP/RRRR";

    fn monitor_for(farm: &MockDeviceFarm) -> RunMonitor {
        let client = DeviceFarmClient::new(Arc::new(farm.clone()));
        let collector = ArtifactCollector::new(
            client.clone(),
            Arc::new(MockTransfer::new()),
            CancelToken::new(),
        );
        RunMonitor::new(
            client,
            collector,
            StatusPoller::default(),
            Duration::from_millis(1),
            "us-west-2",
        )
    }

    fn counters(total: u32, passed: u32, failed: u32) -> Counters {
        Counters {
            total,
            passed,
            failed,
            ..Counters::default()
        }
    }

    #[test]
    fn test_dashboard_url() {
        let url = dashboard_url("arn:aws:devicefarm:us-west-2:111:run:PPPP/RRRR", "us-west-2").unwrap();
        assert!(url.contains("projects/PPPP/runs/RRRR"));
        assert!(url.starts_with("https://us-west-2.console.aws.amazon.com/devicefarm/"));
    }

    #[test]
    fn test_run_arn_pattern_compiled_once() {
        let first = run_arn_regex().unwrap();
        let second = run_arn_regex().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_dashboard_url_rejects_malformed() {
        for arn in [
            "arn:aws:devicefarm:us-west-2:111:upload:PPPP/UUUU",
            "arn:aws:devicefarm:us-west-2:111:run:PPPP",
            "arn:aws:devicefarm:us-west-2:111:run:PPPP/RRRR/extra",
            "",
        ] {
            assert!(matches!(
                dashboard_url(arn, "us-west-2"),
                Err(FarmError::MalformedJobReference(_))
            ));
        }
    }

    #[test]
    fn test_completed_run_is_classified() {
        let farm = MockDeviceFarm::new();
        farm.insert_run(RUN, &["RUNNING", "RUNNING", "COMPLETED"], counters(24, 20, 2), Vec::new());
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor_for(&farm).monitor(&mut job, None);

        assert_eq!(result.class(), OutcomeClass::Failed);
        assert_eq!(result.exit_code(false), ExitCode::TestsFailed);
        assert_eq!(farm.calls_for("get-run"), 3);
        assert_eq!(job.status, "COMPLETED");
    }

    #[test]
    fn test_inconclusive_run_is_errored() {
        let farm = MockDeviceFarm::new();
        farm.insert_run(RUN, &["COMPLETED"], counters(24, 20, 0), Vec::new());
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor_for(&farm).monitor(&mut job, None);
        assert_eq!(result.class(), OutcomeClass::Errored);
        assert!(result.exit_code(false).is_success());
        assert_eq!(result.exit_code(true), ExitCode::TestsErrored);
    }

    #[test]
    fn test_query_failure_becomes_errored_with_exception() {
        let farm = MockDeviceFarm::new();
        farm.insert_run(RUN, &["RUNNING", "COMPLETED"], counters(1, 1, 0), Vec::new());
        farm.inject_failure("get-run", FailureConfig::expired_credentials().after_calls(1));
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor_for(&farm).monitor(&mut job, None);

        match &result {
            MonitorResult::ErroredWithException { error, .. } => {
                assert!(matches!(error, FarmError::RemoteQuery { tick: 2, .. }));
                assert_eq!(error.diagnostic_payload().unwrap()["run"]["status"], "RUNNING");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(result.exit_code(false).as_i32(), -3);
    }

    #[test]
    fn test_timeout_keeps_partial_payload() {
        let farm = MockDeviceFarm::new();
        farm.insert_run(RUN, &["RUNNING"], counters(1, 1, 0), Vec::new());
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor_for(&farm).monitor(&mut job, Some(Duration::from_millis(20)));

        let report = result.to_json().unwrap();
        assert_eq!(report["class"], "errored_with_exception");
        assert_eq!(report["last_payload"]["run"]["status"], "RUNNING");
    }

    #[test]
    fn test_malformed_arn_fails_before_polling() {
        let farm = MockDeviceFarm::new();
        let mut job = RemoteJob::run("not-an-arn", "SCHEDULING");

        let result = monitor_for(&farm).monitor(&mut job, None);

        assert_eq!(result.class(), OutcomeClass::ErroredWithException);
        assert_eq!(farm.call_count(), 0);
    }

    /// Answers every `get-run` with a completed run that has no counters
    struct CountlessRun;

    impl crate::host::ApiTransport for CountlessRun {
        fn call(
            &self,
            call: &crate::host::ApiCall,
        ) -> Result<Value, crate::host::TransportError> {
            Ok(match call {
                crate::host::ApiCall::GetRun { .. } => json!({
                    "run": {"arn": RUN, "status": "COMPLETED", "result": "ERRORED"}
                }),
                _ => json!({"artifacts": []}),
            })
        }
    }

    #[test]
    fn test_completed_run_without_counters_errors_with_exception() {
        let client = DeviceFarmClient::new(Arc::new(CountlessRun));
        let collector =
            ArtifactCollector::new(client.clone(), Arc::new(MockTransfer::new()), CancelToken::new());
        let monitor = RunMonitor::new(
            client,
            collector,
            StatusPoller::default(),
            Duration::from_millis(1),
            "us-west-2",
        );
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor.monitor(&mut job, None);

        match &result {
            MonitorResult::ErroredWithException { error, .. } => {
                assert!(matches!(error, FarmError::IncompleteResult { .. }));
                assert_eq!(error.diagnostic_payload().unwrap()["run"]["result"], "ERRORED");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(result.exit_code(false).as_i32(), -3);
        assert_eq!(result.exit_code(true), ExitCode::ErroredWithException);
    }

    #[test]
    fn test_output_file_receives_final_payload() {
        let farm = MockDeviceFarm::new();
        farm.insert_run(RUN, &["COMPLETED"], counters(3, 3, 0), Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("result.json");
        let mut job = RemoteJob::run(RUN, "SCHEDULING");

        let result = monitor_for(&farm)
            .with_output_file(Some(output.clone()))
            .monitor(&mut job, None);

        assert_eq!(result.class(), OutcomeClass::Success);
        let written: Value = serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["run"]["counters"]["passed"], 3);
    }
}
