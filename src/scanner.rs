use regex::Regex;

/// Outbound anchors. `href="http` covers both `http://` and `https://`.
pub const LINK_PATTERN: &str = r#"href="http"#;
/// Any `<img ...>` tag, used when only the count matters.
pub const IMAGE_TAG_PATTERN: &str = r#"<img\b[^>]*>"#;
/// `src` value of an `<img>` tag, used when images get downloaded.
pub const IMAGE_SRC_PATTERN: &str = r#"<img\b[^>]*?\ssrc="([^"]*)""#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Count `<img>` tags only
    TagCount,
    /// Capture every `src` value so the images can be localized
    WithSources,
}

/// Counts derived from a page's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub num_links: usize,
    pub images: usize,
    /// Image sources in document order, duplicates included.
    /// Empty unless scanned with [`ScanMode::WithSources`].
    pub image_srcs: Vec<String>,
}

/// Pattern-based scanner for stored pages. No markup parser involved.
#[derive(Clone, Debug)]
pub struct PageScanner {
    link_re: Regex,
    image_tag_re: Regex,
    image_src_re: Regex,
}

impl PageScanner {
    pub fn new() -> Self {
        // Patterns are constants covered by tests below
        Self {
            link_re: Regex::new(LINK_PATTERN).expect("valid link pattern"),
            image_tag_re: Regex::new(IMAGE_TAG_PATTERN).expect("valid image tag pattern"),
            image_src_re: Regex::new(IMAGE_SRC_PATTERN).expect("valid image src pattern"),
        }
    }

    pub fn scan(&self, content: &str, mode: ScanMode) -> PageSummary {
        let num_links = self.count_links(content);

        match mode {
            ScanMode::TagCount => PageSummary {
                num_links,
                images: self.count_image_tags(content),
                image_srcs: Vec::new(),
            },
            ScanMode::WithSources => {
                let image_srcs = self.image_sources(content);
                PageSummary {
                    num_links,
                    images: image_srcs.len(),
                    image_srcs,
                }
            }
        }
    }

    pub fn count_links(&self, content: &str) -> usize {
        self.link_re.find_iter(content).count()
    }

    pub fn count_image_tags(&self, content: &str) -> usize {
        self.image_tag_re.find_iter(content).count()
    }

    pub fn image_sources(&self, content: &str) -> Vec<String> {
        self.image_src_re
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for PageScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
            <body>
                <a href="https://example.com/a">A</a>
                <a href="http://example.org/b">B</a>
                <a href="/relative">C</a>
                <img src="/img/logo.png" alt="logo">
                <img alt="banner" src="https://cdn.test/banner.jpg">
                <img data-lazy="true">
            </body>
        </html>
    "#;

    #[test]
    fn test_counts_http_and_https_links() {
        let scanner = PageScanner::new();
        assert_eq!(scanner.count_links(PAGE), 2);
    }

    #[test]
    fn test_tag_count_mode() {
        let summary = PageScanner::new().scan(PAGE, ScanMode::TagCount);
        assert_eq!(summary.num_links, 2);
        assert_eq!(summary.images, 3);
        assert!(summary.image_srcs.is_empty());
    }

    #[test]
    fn test_with_sources_mode() {
        let summary = PageScanner::new().scan(PAGE, ScanMode::WithSources);
        assert_eq!(summary.images, 2);
        assert_eq!(
            summary.image_srcs,
            vec!["/img/logo.png", "https://cdn.test/banner.jpg"]
        );
    }

    #[test]
    fn test_no_images() {
        let scanner = PageScanner::new();
        for mode in [ScanMode::TagCount, ScanMode::WithSources] {
            let summary = scanner.scan("<p>no pictures here</p>", mode);
            assert_eq!(summary.images, 0);
            assert!(summary.image_srcs.is_empty());
        }
    }

    #[test]
    fn test_adjacent_image_tags() {
        let scanner = PageScanner::new();
        let content = r#"<img src="a.png"><img src="b.png"><img src="c.png">"#;

        assert_eq!(scanner.scan(content, ScanMode::TagCount).images, 3);

        let summary = scanner.scan(content, ScanMode::WithSources);
        assert_eq!(summary.images, 3);
        assert_eq!(summary.image_srcs, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_duplicate_sources_are_kept() {
        let content = r#"<img src="/x.png"> text <img src="/x.png">"#;
        let summary = PageScanner::new().scan(content, ScanMode::WithSources);
        assert_eq!(summary.image_srcs, vec!["/x.png", "/x.png"]);
    }

    #[test]
    fn test_src_lookalike_attributes_are_skipped() {
        let content = r#"<img data-src="/lazy.png" src="/real.png">"#;
        let summary = PageScanner::new().scan(content, ScanMode::WithSources);
        assert_eq!(summary.image_srcs, vec!["/real.png"]);
    }

    #[test]
    fn test_other_tags_are_not_images() {
        let scanner = PageScanner::new();
        let content = r#"<imgur-widget src="/w.png"></imgur-widget><image src="/svg.png">"#;
        assert_eq!(scanner.count_image_tags(content), 0);
        assert!(scanner.image_sources(content).is_empty());
    }

    #[test]
    fn test_metadata_lines_do_not_count() {
        let content = "<p></p>\n<meta name=\"cmd-site\" content=\"example.com\">\n<meta name=\"cmd-images\" content=\"3\">";
        let summary = PageScanner::new().scan(content, ScanMode::WithSources);
        assert_eq!(summary, PageSummary::default());
    }
}
