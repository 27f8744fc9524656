//! Byte transfer to and from presigned URLs
//!
//! Uploads PUT the local file to the one-time URL returned by
//! `create-upload`; result artifacts are fetched with a plain GET.
//! Transfers are never retried here.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;

/// Transfer errors
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
}

impl TransferError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Moves bytes between the local filesystem and presigned URLs
pub trait ArtifactTransfer: Send + Sync {
    /// PUT a local file to `url`, returning the number of bytes sent
    fn put_file(&self, url: &str, path: &Path) -> Result<u64, TransferError>;

    /// GET `url` into `dest` (created or truncated), returning bytes written
    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError>;
}

/// Blocking HTTP transfer
pub struct HttpTransfer {
    client: reqwest::blocking::Client,
}

impl HttpTransfer {
    /// Create a transfer client with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransferError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ArtifactTransfer for HttpTransfer {
    fn put_file(&self, url: &str, path: &Path) -> Result<u64, TransferError> {
        let file = File::open(path).map_err(|e| TransferError::io(path, e))?;
        let length = file
            .metadata()
            .map_err(|e| TransferError::io(path, e))?
            .len();

        tracing::debug!(path = %path.display(), bytes = length, "uploading file");

        let response = self
            .client
            .put(url)
            .body(reqwest::blocking::Body::sized(file, length))
            .send()
            .map_err(|e| TransferError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                method: "PUT",
                url: redact_query(url),
                status: status.as_u16(),
            });
        }

        Ok(length)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransferError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                method: "GET",
                url: redact_query(url),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::io(parent, e))?;
        }
        let mut file = File::create(dest).map_err(|e| TransferError::io(dest, e))?;
        let written = response
            .copy_to(&mut file)
            .map_err(|e| TransferError::Http(e.to_string()))?;

        Ok(written)
    }
}

/// Strip the query string (presigned credentials) from a URL for messages
pub fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?<redacted>", base),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("https://bucket.example/key?X-Amz-Signature=abc"),
            "https://bucket.example/key?<redacted>"
        );
        assert_eq!(redact_query("https://bucket.example/key"), "https://bucket.example/key");
    }

    #[test]
    fn test_put_missing_file_is_io_error() {
        let transfer = HttpTransfer::new(Duration::from_secs(5)).unwrap();
        let result = transfer.put_file("http://127.0.0.1:9/upload", Path::new("/nonexistent/app.ipa"));
        assert!(matches!(result, Err(TransferError::Io { .. })));
    }
}
