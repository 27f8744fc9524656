//! Result artifact collection
//!
//! Lists a run's file artifacts and, when given a destination, writes the
//! listing as `list-artifacts.json` and downloads the allow-listed kinds:
//!
//! ```text
//! <dest>/<token(run arn)>/list-artifacts.json
//! <dest>/<token(run arn)>/<token(artifact arn)>/<token(name)>.<token(ext)>
//! ```
//!
//! Each run writes under its own directory, so concurrent collections into
//! the same destination do not collide.

mod collector;
mod sanitize;

pub use collector::{is_collected, ArtifactCollector, Collection, COLLECTED_TYPES, MANIFEST_FILE};
pub use sanitize::{artifact_file_name, fs_token};
