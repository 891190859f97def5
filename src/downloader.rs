use reqwest::{Client, ClientBuilder};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// HTTP GET into a file. Shared by page and image downloads.
#[derive(Clone, Debug)]
pub struct Downloader {
    client: Client,
    timeout_secs: u64,
    tolerate_http_errors: bool,
}

impl Downloader {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Self::build_http_client(config)?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            tolerate_http_errors: config.tolerate_http_errors,
        })
    }

    fn build_http_client(config: &FetchConfig) -> Result<Client, FetchError> {
        ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::ClientBuild)
    }

    /// GET `url` and stream the body into `path`, replacing any existing file.
    /// Returns the number of bytes written.
    ///
    /// The body is staged in a temporary file next to `path` and moved into
    /// place after the last chunk, so a failed request or a body cut short
    /// leaves an earlier copy untouched and no partial file behind.
    pub async fn save_to_file(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        debug!(url, path = %path.display(), "sending request");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, self.timeout_secs))?;

        let status = response.status();
        debug!(url, %status, "response received");

        if !status.is_success() {
            if !self.tolerate_http_errors {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status,
                });
            }
            warn!(url, %status, "saving body of unsuccessful response");
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged =
            NamedTempFile::new_in(dir).map_err(|e| FetchError::file_io("create", path, e))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, self.timeout_secs))?
        {
            staged
                .write_all(&chunk)
                .map_err(|e| FetchError::file_io("write", path, e))?;
            written += chunk.len() as u64;
        }

        staged
            .persist(path)
            .map_err(|e| FetchError::file_io("replace", path, e.error))?;

        debug!(url, bytes = written, "body saved");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves a response that promises 5000 bytes and hangs up after 19.
    async fn cut_short_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = [0u8; 1024];
                    let _ = socket.read(&mut request).await;
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Length: 5000\r\n\r\n<html><body>partial",
                        )
                        .await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}/page", addr)
    }

    fn config() -> FetchConfig {
        FetchConfig {
            timeout_secs: 5,
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_saves_body_and_overwrites() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh body"))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("page.html");
        fs::write(&target, "an older and much longer body").unwrap();

        let downloader = Downloader::new(&config()).unwrap();
        let written = downloader
            .save_to_file(&format!("{}/page", server.uri()), &target)
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh body");
    }

    #[tokio::test]
    async fn test_error_status_is_fatal_and_keeps_old_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("page.html");
        fs::write(&target, "previous").unwrap();

        let downloader = Downloader::new(&config()).unwrap();
        let err = downloader
            .save_to_file(&format!("{}/missing", server.uri()), &target)
            .await
            .unwrap_err();

        match err {
            FetchError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_error_status_can_be_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("page.html");
        let downloader = Downloader::new(&FetchConfig {
            tolerate_http_errors: true,
            ..config()
        })
        .unwrap();

        downloader
            .save_to_file(&server.uri(), &target)
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "oops");
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let downloader = Downloader::new(&FetchConfig {
            timeout_secs: 1,
            ..config()
        })
        .unwrap();

        let err = downloader
            .save_to_file(&server.uri(), &temp_dir.path().join("slow.html"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { secs: 1, .. }));
        assert!(!temp_dir.path().join("slow.html").exists());
    }

    #[tokio::test]
    async fn test_unwritable_target_is_file_io() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("no-such-dir").join("page.html");

        let downloader = Downloader::new(&config()).unwrap();
        let err = downloader.save_to_file(&server.uri(), &target).await.unwrap_err();

        assert!(matches!(err, FetchError::FileIo { op: "create", .. }));
    }

    #[tokio::test]
    async fn test_body_cut_short_keeps_old_file_and_leaves_nothing_behind() {
        let url = cut_short_server().await;

        let temp_dir = tempdir().unwrap();
        let target = temp_dir.path().join("page.html");
        fs::write(&target, "previous good copy").unwrap();

        let downloader = Downloader::new(&config()).unwrap();
        let err = downloader.save_to_file(&url, &target).await.unwrap_err();

        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous good copy");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
