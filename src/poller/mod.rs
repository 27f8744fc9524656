//! Status polling
//!
//! `StatusPoller::wait_for` queries a job's status until it enters the
//! completion set, enters the failure set, or the wall-clock budget runs out.
//! The loop is an explicit state machine:
//!
//! ```text
//!            observe(snapshot)
//! Polling ───────────────────────► Completed(snapshot)   status ∈ completion
//!    │  ▲                    ├───► Failed(snapshot)      status ∈ failure
//!    │  └── sleep(interval) ─┤
//!    │                       └───► TimedOut(snapshot)    budget exceeded
//!    └── cancel token tripped ───► FarmError::Cancelled
//! ```
//!
//! Every transition carries the immutable snapshot that caused it, so the
//! last known state is always available on failure. A failing status query
//! ends the wait immediately with `FarmError::RemoteQuery`; nothing is
//! retried here.

use std::io::Write;
use std::time::Duration;

use serde_json::Value;

use crate::error::{FarmError, FarmResult};
use crate::host::ApiResult;
use crate::job::RemoteJob;
use crate::signal::CancelToken;
use crate::timeout::{Deadline, PollPolicy};

/// What one status query returned
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: String,
    /// Raw response body, kept for diagnostics
    pub payload: Value,
}

/// Immutable record of one poll tick
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub status: String,
    pub payload: Value,
    /// 1-based tick number
    pub tick: u32,
    /// Time since the first query
    pub elapsed: Duration,
}

/// Poll loop state
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Still waiting; holds the latest snapshot once one exists
    Polling(Option<StatusSnapshot>),
    Completed(StatusSnapshot),
    Failed(StatusSnapshot),
    TimedOut(StatusSnapshot),
}

impl PollState {
    /// Transition on a new snapshot
    ///
    /// Terminal statuses win over an exhausted budget: a tick that observes
    /// completion after the deadline still completes.
    pub fn observe(
        snapshot: StatusSnapshot,
        completion: &[&str],
        failure: &[&str],
        budget_exceeded: bool,
    ) -> PollState {
        let status = snapshot.status.as_str();
        if completion.contains(&status) {
            PollState::Completed(snapshot)
        } else if failure.contains(&status) {
            PollState::Failed(snapshot)
        } else if budget_exceeded {
            PollState::TimedOut(snapshot)
        } else {
            PollState::Polling(Some(snapshot))
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling(_))
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PollState::Polling(s) => s.as_ref(),
            PollState::Completed(s) | PollState::Failed(s) | PollState::TimedOut(s) => Some(s),
        }
    }
}

/// Blocking status poller
#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
    cancel: CancelToken,
    progress: bool,
}

impl StatusPoller {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            progress: false,
        }
    }

    /// Print one dot per tick on stderr
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Poll `job` until a terminal status or an exhausted budget
    ///
    /// `completion` and `failure` must be disjoint. On success the job's
    /// status is updated and the final snapshot returned.
    pub fn wait_for<Q>(
        &self,
        job: &mut RemoteJob,
        mut query: Q,
        completion: &[&str],
        failure: &[&str],
        policy: &PollPolicy,
    ) -> FarmResult<StatusSnapshot>
    where
        Q: FnMut(&str) -> ApiResult<StatusReport>,
    {
        debug_assert!(
            completion.iter().all(|s| !failure.contains(s)),
            "completion and failure statuses overlap"
        );

        let deadline = Deadline::start(policy.timeout);
        let mut state = PollState::Polling(None);
        let mut tick: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(job, &state));
            }

            tick += 1;
            let report = match query(&job.arn) {
                Ok(report) => report,
                Err(source) => {
                    self.end_progress();
                    return Err(FarmError::RemoteQuery {
                        job: job.arn.clone(),
                        tick,
                        source,
                        last: state.snapshot().cloned().map(Box::new),
                    });
                }
            };
            job.observe(&report.status);

            let snapshot = StatusSnapshot {
                status: report.status,
                payload: report.payload,
                tick,
                elapsed: deadline.elapsed(),
            };
            tracing::debug!(
                arn = %job.arn,
                kind = %job.kind,
                tick,
                status = %snapshot.status,
                elapsed_ms = snapshot.elapsed.as_millis() as u64,
                "poll tick"
            );
            self.tick_progress();

            state = match PollState::observe(snapshot, completion, failure, deadline.is_exceeded()) {
                PollState::Completed(snapshot) => {
                    self.end_progress();
                    tracing::info!(arn = %job.arn, status = %snapshot.status, ticks = snapshot.tick, "{} finished", job.kind);
                    return Ok(snapshot);
                }
                PollState::Failed(snapshot) => {
                    self.end_progress();
                    return Err(FarmError::RemoteJobFailed {
                        job: job.arn.clone(),
                        status: snapshot.status.clone(),
                        snapshot: Box::new(snapshot),
                    });
                }
                PollState::TimedOut(snapshot) => {
                    self.end_progress();
                    return Err(FarmError::PollTimeout {
                        job: job.arn.clone(),
                        timeout: policy.timeout.unwrap_or_default(),
                        last: Box::new(snapshot),
                    });
                }
                polling => polling,
            };

            let pause = match deadline.remaining() {
                Some(remaining) => policy.interval.min(remaining),
                None => policy.interval,
            };
            if !self.cancel.sleep(pause) {
                return Err(self.cancelled(job, &state));
            }
        }
    }

    fn cancelled(&self, job: &RemoteJob, state: &PollState) -> FarmError {
        self.end_progress();
        tracing::warn!(arn = %job.arn, "polling cancelled");
        FarmError::Cancelled {
            job: job.arn.clone(),
            last: state.snapshot().cloned().map(Box::new),
        }
    }

    fn tick_progress(&self) {
        if self.progress {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, ".");
            let _ = stderr.flush();
        }
    }

    fn end_progress(&self) {
        if self.progress {
            eprintln!();
        }
    }
}
