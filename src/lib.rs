//! Device Farm Lane - test runs on a remote device farm
//!
//! This crate uploads an app and its tests to a remote device-testing
//! service, schedules a run against a device pool, polls it to completion,
//! classifies the result into a process exit code and collects the run's
//! artifacts.

pub mod artifact;
pub mod config;
pub mod error;
pub mod host;
pub mod job;
pub mod mock;
pub mod monitor;
pub mod pipeline;
pub mod poller;
pub mod schedule;
pub mod signal;
pub mod summary;
pub mod timeout;
pub mod upload;

pub use artifact::{ArtifactCollector, Collection};
pub use config::{ConfigError, EffectiveConfig, LaneConfig, DEFAULT_CONFIG_PATH};
pub use error::{FarmError, FarmResult};
pub use job::{JobKind, RemoteJob};
pub use monitor::{dashboard_url, MonitorResult, RunMonitor};
pub use pipeline::{read_run_record, write_run_record, MonitorOutputs, Pipeline, TestRunSpec};
pub use poller::{StatusPoller, StatusSnapshot};
pub use schedule::{RunRequest, RunScheduler, ScheduledRun};
pub use signal::{install_handler, CancelToken};
pub use summary::{ExitCode, OutcomeClass, RunOutcome};
pub use timeout::PollPolicy;
pub use upload::{UploadManager, UploadRequest};
