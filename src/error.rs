//! Error types for offline-fetch

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching, annotating or localizing a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing left after stripping the scheme
    #[error("Invalid URL {input:?}: no host after the scheme")]
    InvalidUrl { input: String },

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    /// Transport-level failure (DNS, connect, reset, body read)
    #[error("Request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the configured timeout
    #[error("Request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Filesystem failure
    #[error("Failed to {op} {}", .path.display())]
    FileIo {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image src without a usable file name after a slash
    #[error("Malformed image reference {src:?}: no file name after a slash")]
    MalformedImageRef { src: String },
}

impl FetchError {
    /// Classify a reqwest error raised while talking to `url`
    pub fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }

    pub fn file_io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::FileIo {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Render an error together with its source chain on one line
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
