//! Host-Side Components
//!
//! Everything that talks to the outside world: the remote job API
//! transport, the typed client layered over it, and the byte transfer to
//! and from presigned URLs.

pub mod client;
pub mod transfer;
pub mod transport;

pub use client::{ApiError, ApiResult, DeviceFarmClient, ScheduleRunRequest, WithRaw};
pub use transfer::{ArtifactTransfer, HttpTransfer, TransferError};
pub use transport::{ApiCall, ApiTransport, AwsCliConfig, AwsCliTransport, TransportError};
