use crate::error::FetchError;

const SCHEMES: [&str; 2] = ["http://", "https://"];
const DEFAULT_SCHEME: &str = "https://";

/// A user-supplied URL normalized into the pieces the fetcher needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebLink {
    base_host: String,
    full_url: String,
    local_filename: String,
}

impl WebLink {
    /// Host and path without the scheme, e.g. `example.com/page`.
    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    /// Scheme plus base host, e.g. `https://example.com/page`.
    pub fn full_url(&self) -> &str {
        &self.full_url
    }

    /// File the page is stored in, e.g. `example.com.page.html`.
    pub fn local_filename(&self) -> &str {
        &self.local_filename
    }

    /// Scheme of `full_url`, without the `://`.
    pub fn scheme(&self) -> &str {
        self.full_url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("https")
    }
}

/// Normalize a raw URL or host string into a [`WebLink`].
///
/// A leading `http://` or `https://` is split off and kept; anything else
/// defaults to `https://`. Fails when nothing is left after the scheme.
pub fn format_link(input: &str) -> Result<WebLink, FetchError> {
    let trimmed = input.trim();

    let (scheme, base_host) = SCHEMES
        .iter()
        .find_map(|scheme| trimmed.strip_prefix(scheme).map(|rest| (*scheme, rest)))
        .unwrap_or((DEFAULT_SCHEME, trimmed));

    if base_host.is_empty() {
        return Err(FetchError::InvalidUrl {
            input: input.to_string(),
        });
    }

    Ok(WebLink {
        base_host: base_host.to_string(),
        full_url: format!("{}{}", scheme, base_host),
        local_filename: format!("{}.html", base_host.replace('/', ".")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_defaults_to_https() {
        let link = format_link("example.com").unwrap();
        assert_eq!(link.base_host(), "example.com");
        assert_eq!(link.full_url(), "https://example.com");
        assert_eq!(link.local_filename(), "example.com.html");
        assert_eq!(link.scheme(), "https");
    }

    #[test]
    fn test_explicit_scheme_is_preserved() {
        let link = format_link("http://example.com/a/b").unwrap();
        assert_eq!(link.base_host(), "example.com/a/b");
        assert_eq!(link.full_url(), "http://example.com/a/b");
        assert_eq!(link.local_filename(), "example.com.a.b.html");
        assert_eq!(link.scheme(), "http");

        let link = format_link("https://example.com").unwrap();
        assert_eq!(link.full_url(), "https://example.com");
    }

    #[test]
    fn test_every_slash_becomes_a_dot() {
        let test_cases = vec![
            ("example.com/", "example.com..html"),
            ("a/b/c/d", "a.b.c.d.html"),
            ("https://news.site/2024/01/story", "news.site.2024.01.story.html"),
        ];

        for (input, expected) in test_cases {
            let link = format_link(input).unwrap();
            assert_eq!(link.local_filename(), expected, "Failed for input: {}", input);
            assert!(!link.local_filename().contains('/'));
        }
    }

    #[test]
    fn test_empty_host_is_rejected() {
        for input in ["", "https://", "http://", "   "] {
            let result = format_link(input);
            assert!(
                matches!(result, Err(FetchError::InvalidUrl { .. })),
                "Expected InvalidUrl for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let link = format_link("  example.com/page \n").unwrap();
        assert_eq!(link.base_host(), "example.com/page");
        assert_eq!(link.full_url(), "https://example.com/page");
    }
}
