use clap::Parser;
use std::path::PathBuf;

use crate::config::{FetchConfig, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::metadata::MetadataPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "fetch",
    about = "Download your webpage for offline use.",
    version,
    long_about = "Downloads the given URLs to local html files and tags each file with metadata (site, number of links, number of images, last fetch time). With --full-download the page's images are downloaded too and the page is rewritten to use the local copies."
)]
pub struct FetchCommand {
    /// URLs or hosts to fetch; https:// is assumed when no scheme is given
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Show metadata of the existing file. If non existent, it will be downloaded
    #[arg(short, long)]
    pub metadata: bool,

    /// Download all images from the HTML for total offline use
    #[arg(short, long)]
    pub full_download: bool,

    /// Directory to store pages and images in
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Timeout for requests in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Stop at the first URL that fails instead of continuing with the rest
    #[arg(long)]
    pub fail_fast: bool,

    /// Replace metadata from earlier fetches instead of appending another block
    #[arg(long)]
    pub replace_metadata: bool,

    /// Save pages answered with an error status instead of failing
    #[arg(long)]
    pub tolerate_http_errors: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl FetchCommand {
    pub fn to_config(&self) -> FetchConfig {
        FetchConfig {
            output_dir: self.output_dir.clone(),
            show_metadata: self.metadata,
            full_download: self.full_download,
            timeout_secs: self.timeout,
            user_agent: self.user_agent.clone(),
            fail_fast: self.fail_fast,
            metadata_policy: if self.replace_metadata {
                MetadataPolicy::Replace
            } else {
                MetadataPolicy::Append
            },
            tolerate_http_errors: self.tolerate_http_errors,
        }
    }
}
