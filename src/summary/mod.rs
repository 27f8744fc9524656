//! Run outcomes and stable exit codes

mod exit;
mod outcome;

pub use exit::{ExitCode, OutcomeClass};
pub use outcome::RunOutcome;
