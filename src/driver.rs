use chrono::Utc;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::FetchConfig;
use crate::downloader::Downloader;
use crate::error::{error_chain, FetchError};
use crate::file_manager::FileManager;
use crate::link::{format_link, WebLink};
use crate::localizer::ImageLocalizer;
use crate::metadata::{append_metadata, read_metadata, MetadataBlock, MetadataRecord};
use crate::scanner::{PageScanner, ScanMode};

/// What happened to one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Page was downloaded and annotated
    Fetched {
        filename: String,
        images_localized: usize,
        images_skipped: usize,
    },
    /// Page was already on disk and only its metadata was read
    AlreadyDownloaded { filename: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReport {
    pub input: String,
    pub outcome: UrlOutcome,
    /// Records read back when metadata display was requested
    pub metadata: Vec<MetadataRecord>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: Vec<UrlReport>,
    pub failed: Vec<(String, FetchError)>,
    /// URLs never started, because of cancellation or `--fail-fast`
    pub not_started: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_started.is_empty()
    }

    /// 0 when every URL succeeded, 2 when any failed or was not started.
    /// Usage errors (1) are reported by argument parsing before a run exists.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            2
        }
    }
}

/// Processes URLs one at a time: fetch, annotate, optionally localize images.
pub struct FetchRunner {
    config: FetchConfig,
    downloader: Downloader,
    file_manager: FileManager,
    scanner: PageScanner,
    localizer: ImageLocalizer,
    cancelled: Arc<AtomicBool>,
}

impl FetchRunner {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let downloader = Downloader::new(&config)?;
        let file_manager = FileManager::new(&config.output_dir)?;
        let localizer = ImageLocalizer::new(downloader.clone(), file_manager.clone());

        Ok(Self {
            config,
            downloader,
            file_manager,
            scanner: PageScanner::new(),
            localizer,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked before each URL; set it to stop the batch early.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub async fn run(&self, urls: &[String]) -> RunSummary {
        let mut summary = RunSummary::default();

        for (index, input) in urls.iter().enumerate() {
            if self.cancelled.load(Ordering::SeqCst) {
                println!("🛑 Cancelled, skipping {} remaining URL(s)", urls.len() - index);
                summary.not_started.extend(urls[index..].iter().cloned());
                break;
            }

            let span = info_span!("url", input = input.as_str());
            match self.process_url(input).instrument(span).await {
                Ok(report) => {
                    self.print_report(&report);
                    summary.succeeded.push(report);
                }
                Err(e) => {
                    let message = error_chain(&e);
                    error!(input = input.as_str(), "{}", message);
                    eprintln!("❌ {}: {}", input.red(), message);
                    summary.failed.push((input.clone(), e));

                    if self.config.fail_fast {
                        summary.not_started.extend(urls[index + 1..].iter().cloned());
                        break;
                    }
                }
            }
            println!();
        }

        self.print_summary(&summary);
        summary
    }

    /// Handle one URL according to the metadata flag and what is on disk.
    pub async fn process_url(&self, input: &str) -> Result<UrlReport, FetchError> {
        let link = format_link(input)?;
        let filename = link.local_filename().to_string();

        if !self.config.show_metadata {
            let outcome = self.fetch(&link).await?;
            return Ok(UrlReport {
                input: input.to_string(),
                outcome,
                metadata: Vec::new(),
            });
        }

        let outcome = if self.file_manager.file_exists(&filename) {
            println!("📄 Already downloaded: {}", filename.cyan());
            UrlOutcome::AlreadyDownloaded {
                filename: filename.clone(),
            }
        } else {
            println!("📥 Downloading now: {}", link.full_url().blue());
            self.fetch(&link).await?
        };

        let metadata = read_metadata(&self.file_manager, &filename)?;
        Ok(UrlReport {
            input: input.to_string(),
            outcome,
            metadata,
        })
    }

    /// Download the page, append its metadata and localize images if asked.
    ///
    /// All work happens on a staging copy that replaces the stored page only
    /// once every step has succeeded. On failure the staging copy is removed
    /// and an earlier page, if any, stays as it was.
    pub async fn fetch(&self, link: &WebLink) -> Result<UrlOutcome, FetchError> {
        let filename = link.local_filename();
        let staging = format!("{}.part", filename);

        match self.build_page(link, &staging).await {
            Ok(outcome) => {
                self.file_manager.rename(&staging, filename)?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(cleanup) = self.file_manager.remove(&staging) {
                    warn!(file = staging.as_str(), "{}", error_chain(&cleanup));
                }
                Err(e)
            }
        }
    }

    async fn build_page(&self, link: &WebLink, staging: &str) -> Result<UrlOutcome, FetchError> {
        let filename = link.local_filename();
        let target = self.file_manager.resolve(staging);

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress_bar.set_message(format!("Fetching: {}", link.full_url()));
        progress_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        let saved = self.downloader.save_to_file(link.full_url(), &target).await;
        progress_bar.finish_and_clear();
        let bytes = saved?;
        info!(url = link.full_url(), file = filename, bytes, "page downloaded");

        let content = self.file_manager.read_to_string(staging)?;
        let mode = if self.config.full_download {
            ScanMode::WithSources
        } else {
            ScanMode::TagCount
        };
        let summary = self.scanner.scan(&content, mode);
        let block = MetadataBlock::for_page(link, &summary, Utc::now());
        let content = append_metadata(
            &self.file_manager,
            staging,
            &content,
            &block,
            self.config.metadata_policy,
        )?;

        let mut outcome = UrlOutcome::Fetched {
            filename: filename.to_string(),
            images_localized: 0,
            images_skipped: 0,
        };

        if self.config.full_download {
            // Sources come from the page text as it reads after the metadata append
            let image_srcs = self.scanner.image_sources(&content);
            let report = self.localizer.localize(link, content, &image_srcs).await?;
            self.file_manager.overwrite(staging, &report.document)?;

            outcome = UrlOutcome::Fetched {
                filename: filename.to_string(),
                images_localized: report.localized.len(),
                images_skipped: report.skipped.len(),
            };
        }

        println!("✅ Saved {} ({} bytes)", filename.green(), bytes);
        Ok(outcome)
    }

    fn print_report(&self, report: &UrlReport) {
        if let UrlOutcome::Fetched {
            images_localized,
            images_skipped,
            ..
        } = &report.outcome
        {
            if self.config.full_download {
                println!(
                    "🖼️  Images localized: {}, skipped: {}",
                    images_localized, images_skipped
                );
            }
        }

        for record in &report.metadata {
            println!("{}", record);
        }
    }

    fn print_summary(&self, summary: &RunSummary) {
        let total = summary.succeeded.len() + summary.failed.len() + summary.not_started.len();
        if total <= 1 {
            return;
        }

        println!(
            "📊 {} succeeded, {} failed, {} not started",
            summary.succeeded.len().to_string().green(),
            summary.failed.len().to_string().red(),
            summary.not_started.len()
        );
        for (input, e) in &summary.failed {
            println!("   {} {}: {}", "✗".red(), input, e);
        }
    }
}
