//! Poll loop properties over scripted status sequences

use std::thread;
use std::time::{Duration, Instant};

use devicefarm_lane::host::ApiResult;
use devicefarm_lane::poller::StatusReport;
use devicefarm_lane::{CancelToken, FarmError, PollPolicy, RemoteJob, StatusPoller};
use serde_json::json;

fn scripted(statuses: &'static [&'static str]) -> impl FnMut(&str) -> ApiResult<StatusReport> {
    let mut next = 0usize;
    move |_arn| {
        let status = statuses[next.min(statuses.len() - 1)];
        next += 1;
        Ok(StatusReport {
            status: status.to_string(),
            payload: json!({"upload": {"status": status}}),
        })
    }
}

fn policy(interval_ms: u64, timeout_ms: Option<u64>) -> PollPolicy {
    PollPolicy::new(
        Duration::from_millis(interval_ms),
        timeout_ms.map(Duration::from_millis),
    )
}

#[test]
fn test_query_count_matches_progression() {
    let poller = StatusPoller::default();
    let mut job = RemoteJob::upload("arn:upload", "INITIALIZED");

    let snapshot = poller
        .wait_for(
            &mut job,
            scripted(&["INITIALIZED", "PROCESSING", "PROCESSING", "SUCCEEDED"]),
            &["SUCCEEDED"],
            &["FAILED"],
            &policy(1, None),
        )
        .unwrap();

    assert_eq!(snapshot.tick, 4);
    assert_eq!(job.status, "SUCCEEDED");
}

#[test]
fn test_budget_bounds_query_count() {
    let poller = StatusPoller::default();
    let mut job = RemoteJob::run("arn:run", "RUNNING");
    let started = Instant::now();

    let err = poller
        .wait_for(
            &mut job,
            scripted(&["RUNNING"]),
            &["COMPLETED"],
            &[],
            &policy(20, Some(100)),
        )
        .unwrap_err();

    match err {
        FarmError::PollTimeout { last, timeout, .. } => {
            assert_eq!(timeout, Duration::from_millis(100));
            // one query at t=0, then at most one per interval
            assert!(last.tick >= 2 && last.tick <= 8, "tick {}", last.tick);
            assert_eq!(last.status, "RUNNING");
        }
        other => panic!("expected PollTimeout, got {:?}", other),
    }
    // sleeps are capped at the remaining budget
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[test]
fn test_cancel_wakes_sleeping_poller() {
    let cancel = CancelToken::new();
    let poller = StatusPoller::new(cancel.clone());
    let mut job = RemoteJob::run("arn:run", "RUNNING");

    let trigger = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        trigger.cancel();
    });

    let started = Instant::now();
    let err = poller
        .wait_for(
            &mut job,
            scripted(&["RUNNING"]),
            &["COMPLETED"],
            &[],
            &policy(60_000, None),
        )
        .unwrap_err();
    handle.join().unwrap();

    match err {
        FarmError::Cancelled { last, .. } => {
            assert_eq!(last.unwrap().status, "RUNNING");
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_failure_status_stops_immediately() {
    let poller = StatusPoller::default();
    let mut job = RemoteJob::upload("arn:upload", "INITIALIZED");

    let err = poller
        .wait_for(
            &mut job,
            scripted(&["PROCESSING", "FAILED", "SUCCEEDED"]),
            &["SUCCEEDED"],
            &["FAILED"],
            &policy(1, None),
        )
        .unwrap_err();

    assert!(matches!(err, FarmError::RemoteJobFailed { ref status, .. } if status == "FAILED"));
    assert_eq!(job.status, "FAILED");
}
