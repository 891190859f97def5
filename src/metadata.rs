//! Metadata records appended to stored pages.
//!
//! Each record is one line of the form
//! `<meta name="cmd-<key>" content="<value>">`, preceded by a newline.
//! A block is always `site`, `num_links`, `images`, `last_fetch`, in that order.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::FetchError;
use crate::file_manager::FileManager;
use crate::link::WebLink;
use crate::scanner::PageSummary;

pub const KEY_SITE: &str = "site";
pub const KEY_NUM_LINKS: &str = "num_links";
pub const KEY_IMAGES: &str = "images";
pub const KEY_LAST_FETCH: &str = "last_fetch";

const RECORD_PATTERN: &str = r#"<meta name="cmd-([^"]+)" content="([^"]*)">"#;
/// RFC 1123, always in UTC.
const FETCH_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// What to do with records left by earlier fetches of the same page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataPolicy {
    /// Keep them; every fetch adds another block
    #[default]
    Append,
    /// Remove them before writing the new block
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub key: String,
    pub value: String,
}

impl MetadataRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The record as it is stored, leading newline included.
    pub fn render(&self) -> String {
        format!(
            "\n<meta name=\"cmd-{}\" content=\"{}\">",
            self.key,
            escape(&self.value)
        )
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// The four records written after every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock {
    records: Vec<MetadataRecord>,
}

impl MetadataBlock {
    pub fn new(site: &str, num_links: usize, images: usize, last_fetch: &str) -> Self {
        Self {
            records: vec![
                MetadataRecord::new(KEY_SITE, site),
                MetadataRecord::new(KEY_NUM_LINKS, num_links.to_string()),
                MetadataRecord::new(KEY_IMAGES, images.to_string()),
                MetadataRecord::new(KEY_LAST_FETCH, last_fetch),
            ],
        }
    }

    pub fn for_page(link: &WebLink, summary: &PageSummary, fetched_at: DateTime<Utc>) -> Self {
        Self::new(
            link.base_host(),
            summary.num_links,
            summary.images,
            &format_fetch_time(fetched_at),
        )
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    pub fn render(&self) -> String {
        self.records.iter().map(MetadataRecord::render).collect()
    }
}

pub fn format_fetch_time(at: DateTime<Utc>) -> String {
    at.format(FETCH_TIME_FORMAT).to_string()
}

fn record_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RECORD_PATTERN).expect("valid metadata record pattern"))
}

/// Every record in `content`, in document order. Duplicates from repeated
/// fetches are all returned.
pub fn parse_records(content: &str) -> Vec<MetadataRecord> {
    record_regex()
        .captures_iter(content)
        .map(|cap| MetadataRecord::new(&cap[1], unescape(&cap[2])))
        .collect()
}

/// Remove every record line, including the newline written in front of it.
pub fn strip_records(content: &str) -> String {
    let mut stripped = String::with_capacity(content.len());
    let mut last = 0;

    for m in record_regex().find_iter(content) {
        let mut start = m.start();
        if content[last..start].ends_with('\n') {
            start -= 1;
        }
        stripped.push_str(&content[last..start]);
        last = m.end();
    }
    stripped.push_str(&content[last..]);

    stripped
}

/// Write `block` to the stored page and return the page text as it now reads.
///
/// With [`MetadataPolicy::Append`] the block goes to the end of the file and
/// nothing before it is touched. With [`MetadataPolicy::Replace`] earlier
/// records are dropped and the file is rewritten.
pub fn append_metadata(
    file_manager: &FileManager,
    filename: &str,
    content: &str,
    block: &MetadataBlock,
    policy: MetadataPolicy,
) -> Result<String, FetchError> {
    let rendered = block.render();

    match policy {
        MetadataPolicy::Append => {
            file_manager.append(filename, &rendered)?;
            Ok(format!("{}{}", content, rendered))
        }
        MetadataPolicy::Replace => {
            let updated = format!("{}{}", strip_records(content), rendered);
            file_manager.overwrite(filename, &updated)?;
            Ok(updated)
        }
    }
}

pub fn read_metadata(
    file_manager: &FileManager,
    filename: &str,
) -> Result<Vec<MetadataRecord>, FetchError> {
    let content = file_manager.read_to_string(filename)?;
    Ok(parse_records(&content))
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}
