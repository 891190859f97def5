use std::path::PathBuf;
use std::time::Duration;

use crate::metadata::MetadataPolicy;

pub const DEFAULT_USER_AGENT: &str = "OfflineFetch/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything a run needs, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory that receives pages and per-site image directories
    pub output_dir: PathBuf,
    /// Print stored metadata, fetching only when the page is missing
    pub show_metadata: bool,
    /// Also download images and point the page at the local copies
    pub full_download: bool,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Abort the batch at the first failing URL
    pub fail_fast: bool,
    pub metadata_policy: MetadataPolicy,
    /// Save non-2xx bodies instead of failing the URL
    pub tolerate_http_errors: bool,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            show_metadata: false,
            full_download: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fail_fast: false,
            metadata_policy: MetadataPolicy::Append,
            tolerate_http_errors: false,
        }
    }
}
