//! In-memory stand-in for presigned URL transfers

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::host::{ArtifactTransfer, TransferError};

/// One recorded PUT
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Default)]
struct TransferState {
    puts: Vec<RecordedPut>,
    downloads: Vec<String>,
    served: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    fail_puts: bool,
}

/// Mock transfer: PUTs read the local file and are recorded, GETs are
/// served from a URL map
#[derive(Clone, Default)]
pub struct MockTransfer {
    state: Arc<Mutex<TransferState>>,
}

impl MockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve `body` for GETs of `url`
    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.state().served.insert(url.to_string(), body.into());
    }

    /// Make every transfer to or from `url` fail with status 403
    pub fn fail_url(&self, url: &str) {
        self.state().failing.insert(url.to_string());
    }

    /// Make every PUT fail with status 403
    pub fn fail_all_puts(&self) {
        self.state().fail_puts = true;
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state().puts.clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state().downloads.clone()
    }

    /// Total number of transfers attempted
    pub fn call_count(&self) -> usize {
        let state = self.state();
        state.puts.len() + state.downloads.len()
    }
}

impl ArtifactTransfer for MockTransfer {
    fn put_file(&self, url: &str, path: &Path) -> Result<u64, TransferError> {
        let bytes = fs::metadata(path)
            .map_err(|e| TransferError::io(path, e))?
            .len();

        let mut state = self.state();
        state.puts.push(RecordedPut {
            url: url.to_string(),
            path: path.to_path_buf(),
            bytes,
        });

        if state.fail_puts || state.failing.contains(url) {
            return Err(TransferError::Status {
                method: "PUT",
                url: url.to_string(),
                status: 403,
            });
        }

        Ok(bytes)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let body = {
            let mut state = self.state();
            state.downloads.push(url.to_string());

            if state.failing.contains(url) {
                return Err(TransferError::Status {
                    method: "GET",
                    url: url.to_string(),
                    status: 403,
                });
            }

            state
                .served
                .get(url)
                .cloned()
                .ok_or_else(|| TransferError::Status {
                    method: "GET",
                    url: url.to_string(),
                    status: 404,
                })?
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        fs::write(dest, &body).map_err(|e| TransferError::io(dest, e))?;

        Ok(body.len() as u64)
    }
}
