pub mod cli;
pub mod config;
pub mod downloader;
pub mod driver;
pub mod error;
pub mod file_manager;
pub mod link;
pub mod localizer;
pub mod logging;
pub mod metadata;
pub mod scanner;

// Re-export main types for convenience
pub use cli::FetchCommand;
pub use config::FetchConfig;
pub use downloader::Downloader;
pub use driver::{FetchRunner, RunSummary, UrlOutcome, UrlReport};
pub use error::FetchError;
pub use file_manager::FileManager;
pub use link::{format_link, WebLink};
pub use localizer::{ImageLocalizer, ImageRef, LocalizeReport};
pub use metadata::{MetadataBlock, MetadataPolicy, MetadataRecord};
pub use scanner::{PageScanner, PageSummary, ScanMode};
