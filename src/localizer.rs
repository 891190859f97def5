use colored::*;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use url::Url;

use crate::downloader::Downloader;
use crate::error::FetchError;
use crate::file_manager::FileManager;
use crate::link::WebLink;

/// Last path segment with an extension, after a slash. Query and fragment are ignored.
const IMAGE_NAME_PATTERN: &str = r"/([^/?#]+\.[A-Za-z0-9]+)(?:[?#].*)?$";

/// One image that was downloaded and rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// `src` exactly as it appeared in the page
    pub original_src: String,
    /// URL the image was fetched from
    pub source_url: String,
    /// Path written into the page, relative to the output directory
    pub local_path: String,
}

#[derive(Debug)]
pub struct LocalizeReport {
    /// Page text with every localized src replaced
    pub document: String,
    pub localized: Vec<ImageRef>,
    /// Sources left untouched, with the reason
    pub skipped: Vec<(String, FetchError)>,
}

/// Downloads a page's images into `<output>/<base host>/` and points the
/// page text at the local copies.
///
/// Rewriting is a plain text replace over the whole document, so a src that
/// also appears outside an `<img>` tag is rewritten there too. All sources are
/// replaced in a single pass; paths written by the rewrite are never matched again.
#[derive(Clone, Debug)]
pub struct ImageLocalizer {
    downloader: Downloader,
    file_manager: FileManager,
    name_re: Regex,
}

impl ImageLocalizer {
    pub fn new(downloader: Downloader, file_manager: FileManager) -> Self {
        Self {
            downloader,
            file_manager,
            name_re: Regex::new(IMAGE_NAME_PATTERN).expect("valid image name pattern"),
        }
    }

    /// File name an image is stored under, taken from the last path segment.
    pub fn local_name(&self, src: &str) -> Result<String, FetchError> {
        self.name_re
            .captures(src)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| FetchError::MalformedImageRef {
                src: src.to_string(),
            })
    }

    /// Absolute URL to download `src` from.
    ///
    /// `/path` is appended to the page's full URL, `//host/path` takes the
    /// page's scheme, absolute URLs are used as-is and anything else is
    /// resolved relative to the page.
    pub fn source_url(&self, link: &WebLink, src: &str) -> Result<String, FetchError> {
        if src.starts_with("http://") || src.starts_with("https://") {
            Ok(src.to_string())
        } else if src.starts_with("//") {
            Ok(format!("{}:{}", link.scheme(), src))
        } else if src.starts_with('/') {
            Ok(format!("{}{}", link.full_url(), src))
        } else {
            let malformed = || FetchError::MalformedImageRef {
                src: src.to_string(),
            };
            let page = Url::parse(&format!("{}/", link.full_url())).map_err(|_| malformed())?;
            page.join(src)
                .map(|url| url.to_string())
                .map_err(|_| malformed())
        }
    }

    pub async fn localize(
        &self,
        link: &WebLink,
        document: String,
        image_srcs: &[String],
    ) -> Result<LocalizeReport, FetchError> {
        self.file_manager.ensure_dir(link.base_host())?;

        let mut localized = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for src in image_srcs {
            if !seen.insert(src.as_str()) {
                continue;
            }

            let name = match self.local_name(src) {
                Ok(name) => name,
                Err(e) => {
                    warn!(page = link.full_url(), src = src.as_str(), "skipping image: {}", e);
                    println!("⚠️  Skipping image {}: no file name", src.yellow());
                    skipped.push((src.clone(), e));
                    continue;
                }
            };

            let source_url = match self.source_url(link, src) {
                Ok(url) => url,
                Err(e) => {
                    warn!(page = link.full_url(), src = src.as_str(), "skipping image: {}", e);
                    skipped.push((src.clone(), e));
                    continue;
                }
            };

            let local_path = format!("{}/{}", link.base_host(), name);
            let target = self.file_manager.resolve(&local_path);

            debug!(src = src.as_str(), url = source_url.as_str(), "downloading image");
            self.downloader.save_to_file(&source_url, &target).await?;
            println!("🖼️  {} -> {}", source_url, local_path.green());

            localized.push(ImageRef {
                original_src: src.clone(),
                source_url,
                local_path,
            });
        }

        let replacements: Vec<(&str, &str)> = localized
            .iter()
            .map(|image| (image.original_src.as_str(), image.local_path.as_str()))
            .collect();
        let document = rewrite_sources(&document, &replacements);

        info!(
            page = link.full_url(),
            localized = localized.len(),
            skipped = skipped.len(),
            "images localized"
        );

        Ok(LocalizeReport {
            document,
            localized,
            skipped,
        })
    }
}

/// Replace every literal occurrence of each original src with its local path.
///
/// One pass over `document`: at each position the longest matching src wins,
/// and replaced text is not scanned again.
pub fn rewrite_sources(document: &str, replacements: &[(&str, &str)]) -> String {
    let mut ordered: Vec<&(&str, &str)> = replacements
        .iter()
        .filter(|(src, _)| !src.is_empty())
        .collect();
    if ordered.is_empty() {
        return document.to_string();
    }
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let alternation = ordered
        .iter()
        .map(|(src, _)| regex::escape(src))
        .collect::<Vec<_>>()
        .join("|");
    let lookup: HashMap<&str, &str> = ordered.iter().map(|(src, path)| (*src, *path)).collect();

    match Regex::new(&alternation) {
        Ok(re) => re
            .replace_all(document, |caps: &Captures| {
                lookup.get(&caps[0]).copied().unwrap_or(&caps[0]).to_string()
            })
            .into_owned(),
        Err(e) => {
            // Only reachable when the combined pattern exceeds the regex size limit
            warn!("falling back to sequential rewrite: {}", e);
            ordered
                .iter()
                .fold(document.to_string(), |doc, (src, path)| doc.replace(src, path))
        }
    }
}
