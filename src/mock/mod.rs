//! In-process fakes for the remote service
//!
//! `MockDeviceFarm` answers every remote job API call from scripted state:
//! each upload and run walks through a configurable status progression,
//! one step per status query. `MockTransfer` stands in for presigned URL
//! transfers. Both count calls so tests can assert that no network traffic
//! happened, and both support failure injection.
//!
//! # Operations
//!
//! - `create-upload` / `get-upload`: upload progression (default: PROCESSING, SUCCEEDED)
//! - `schedule-run` / `get-run`: run progression (default: RUNNING, COMPLETED) and counters
//! - `list-artifacts`: scripted artifact listing
//! - `list-device-pools` / `list-projects`: scripted listings

mod failure;
mod service;
mod state;
mod transfer;

pub use failure::{FailureConfig, FailureInjector};
pub use service::MockDeviceFarm;
pub use state::{MockRun, MockState, MockUpload, MOCK_ACCOUNT, MOCK_REGION};
pub use transfer::{MockTransfer, RecordedPut};
