//! Single-image fetching with validation and atomic placement.
//!
//! The fetch path is deliberately paranoid: entry content points at
//! arbitrary third-party hosts, and a half-written or bogus file on disk
//! is worse than a missing one. Bytes stream into `<filename>.tmp`, get
//! validated, and only then move into place.

use crate::consts;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Response head plus a streaming body, as much of HTTP as this pipeline
/// needs to see.
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, std::io::Result<Bytes>>,
}

/// Where image bytes come from.
///
/// The one production implementation is [`HttpTransport`]; tests swap in
/// [`MockTransport`] so the pipeline can run without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Response>;
}

/// Shared handle to a transport implementation.
pub type TransportHandle = Arc<dyn Transport>;

/// Transport over a pooled `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the client with the pipeline's timeouts baked in.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(consts::CONNECT_TIMEOUT)
            .timeout(consts::TOTAL_TIMEOUT)
            .user_agent(consts::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Response> {
        let response =
            self.client.get(url).send().await.map_err(|e| ErrorKind::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        // Read the header instead of reqwest's decoded-length helper; the
        // declared value is what gets checked against bytes on disk.
        let content_length = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let body = response.bytes_stream().map(|chunk| chunk.map_err(std::io::Error::other)).boxed();
        Ok(Response { status, content_type, content_length, body })
    }
}

/// Downloads one image at a time into an entry directory.
///
/// # Examples
///
/// ```no_run
/// use inkfeed_offline::Fetcher;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Fetcher::over_http()?;
/// fetcher
///     .fetch_image("https://cdn.example.com/panel.png", Path::new("/library/1041"), "image_001.png")
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Fetcher {
    transport: TransportHandle,
}

impl Fetcher {
    pub fn new(transport: TransportHandle) -> Self {
        Self { transport }
    }

    /// Fetcher backed by a real HTTP client.
    pub fn over_http() -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    /// Download `url` into `dir/filename`.
    ///
    /// The transfer streams into `dir/filename.tmp` first. The final file
    /// appears only after the body passed every check; on any failure the
    /// temporary is removed, so a `.tmp` never outlives the call.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::BadStatus`] on any status other than 200
    /// * [`ErrorKind::BadContentType`] when the server declares a
    ///   content-type that is not `image/*` or `application/octet-stream`
    ///   (a missing content-type is tolerated)
    /// * [`ErrorKind::TooSmall`] / [`ErrorKind::TooLarge`] outside
    ///   [`MIN_IMAGE_BYTES`](consts::MIN_IMAGE_BYTES)..=[`MAX_IMAGE_BYTES`](consts::MAX_IMAGE_BYTES)
    /// * [`ErrorKind::LengthMismatch`] when a declared content-length does
    ///   not match the bytes received
    #[instrument(skip(self, dir))]
    pub async fn fetch_image(&self, url: &str, dir: &Path, filename: &str) -> Result<()> {
        let target = dir.join(filename);
        let tmp = dir.join(format!("{filename}.tmp"));
        let result = self.fetch_to(url, &tmp, &target).await;
        if result.is_err() {
            // A dangling .tmp would shadow the real file on a later attempt.
            let _ = fs::remove_file(&tmp).await;
        }
        result
    }

    async fn fetch_to(&self, url: &str, tmp: &Path, target: &Path) -> Result<()> {
        let response = self.transport.get(url).await?;
        if response.status != 200 {
            exn::bail!(ErrorKind::BadStatus(response.status));
        }
        if let Some(content_type) = &response.content_type
            && !acceptable_content_type(content_type)
        {
            exn::bail!(ErrorKind::BadContentType(content_type.clone()));
        }
        if let Some(declared) = response.content_length
            && declared > consts::MAX_IMAGE_BYTES
        {
            exn::bail!(ErrorKind::TooLarge(declared));
        }

        let written = write_body(response.body, tmp).await?;
        if written < consts::MIN_IMAGE_BYTES {
            exn::bail!(ErrorKind::TooSmall(written));
        }
        if let Some(declared) = response.content_length
            && declared != written
        {
            exn::bail!(ErrorKind::LengthMismatch { expected: declared, actual: written });
        }

        // Replace-by-rename; an existing file from an earlier run goes
        // first so the rename cannot fail on platforms that refuse to
        // clobber.
        match fs::remove_file(target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(exn::Exn::from(ErrorKind::Io(e))),
        }
        fs::rename(tmp, target).await.map_err(ErrorKind::Io)?;
        // Confirm the result actually opens before reporting success.
        if let Err(e) = fs::File::open(target).await {
            let _ = fs::remove_file(target).await;
            return Err(exn::Exn::from(ErrorKind::Io(e)));
        }
        debug!(target = %target.display(), bytes = written, "image saved");
        Ok(())
    }
}

async fn write_body(mut body: BoxStream<'static, std::io::Result<Bytes>>, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await.map_err(ErrorKind::Io)?;
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(ErrorKind::Io)?;
        written += chunk.len() as u64;
        // Enforced mid-stream so a mislabelled multi-gigabyte body cannot
        // fill the device.
        if written > consts::MAX_IMAGE_BYTES {
            exn::bail!(ErrorKind::TooLarge(written));
        }
        file.write_all(&chunk).await.map_err(ErrorKind::Io)?;
    }
    file.flush().await.map_err(ErrorKind::Io)?;
    Ok(written)
}

fn acceptable_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.starts_with("image/") || essence == "application/octet-stream"
}

/// In-memory transport for testing.
///
/// Responses are keyed by exact URL; anything else fails with a transport
/// error. Requests are recorded so tests can assert what was (not)
/// fetched.
#[cfg(any(test, feature = "mock"))]
pub struct MockTransport {
    responses: std::collections::HashMap<String, MockResponse>,
    requests: std::sync::Mutex<Vec<String>>,
}

/// Canned response served by [`MockTransport`].
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Vec<u8>,
}

#[cfg(any(test, feature = "mock"))]
impl MockResponse {
    /// A well-formed 200 PNG response with a matching content-length.
    pub fn image(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            content_type: Some("image/png".to_string()),
            content_length: Some(body.len() as u64),
            body,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn without_content_type(mut self) -> Self {
        self.content_type = None;
        self
    }

    pub fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }
}

#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    /// Create a transport pre-loaded with canned responses.
    pub fn with_responses(
        responses: impl IntoIterator<Item = (impl Into<String>, MockResponse)>,
    ) -> Self {
        Self {
            responses: responses.into_iter().map(|(url, response)| (url.into(), response)).collect(),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockTransport {
    fn default() -> Self {
        let responses: [(&str, MockResponse); 0] = [];
        Self::with_responses(responses)
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<Response> {
        self.requests.lock().unwrap().push(url.to_string());
        let Some(mock) = self.responses.get(url) else {
            exn::bail!(ErrorKind::Transport(format!("no canned response for {url}")));
        };
        Ok(Response {
            status: mock.status,
            content_type: mock.content_type.clone(),
            content_length: mock.content_length,
            body: futures::stream::iter([Ok(Bytes::from(mock.body.clone()))]).boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfakeimagedata";

    fn fetcher(responses: impl IntoIterator<Item = (&'static str, MockResponse)>) -> Fetcher {
        Fetcher::new(Arc::new(MockTransport::with_responses(responses)))
    }

    fn assert_no_tmp(dir: &Path) {
        let leftovers: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_fetch_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([("https://cdn.example.com/a.png", MockResponse::image(PNG))]);
        fetcher.fetch_image("https://cdn.example.com/a.png", dir.path(), "image_001.png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("image_001.png")).unwrap(), PNG);
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_001.png"), b"stale bytes").unwrap();
        let fetcher = fetcher([("https://cdn.example.com/a.png", MockResponse::image(PNG))]);
        fetcher.fetch_image("https://cdn.example.com/a.png", dir.path(), "image_001.png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("image_001.png")).unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_200() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            fetcher([("https://cdn.example.com/a.png", MockResponse::image(PNG).with_status(404))]);
        let err = fetcher
            .fetch_image("https://cdn.example.com/a.png", dir.path(), "image_001.png")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::BadStatus(404)));
        assert!(!dir.path().join("image_001.png").exists());
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_rejects_html_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([(
            "https://cdn.example.com/a.png",
            MockResponse::image(PNG).with_content_type("text/html; charset=utf-8"),
        )]);
        let err = fetcher
            .fetch_image("https://cdn.example.com/a.png", dir.path(), "image_001.png")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::BadContentType(_)));
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_tolerates_loose_content_types() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([
            ("https://a.example/1", MockResponse::image(PNG).without_content_type()),
            ("https://a.example/2", MockResponse::image(PNG).with_content_type("application/octet-stream")),
            ("https://a.example/3", MockResponse::image(PNG).with_content_type("IMAGE/JPEG; q=1")),
        ]);
        for (url, name) in
            [("https://a.example/1", "a.png"), ("https://a.example/2", "b.png"), ("https://a.example/3", "c.png")]
        {
            fetcher.fetch_image(url, dir.path(), name).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_tiny_body() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([("https://cdn.example.com/px.gif", MockResponse::image(b"tiny".to_vec()))]);
        let err = fetcher
            .fetch_image("https://cdn.example.com/px.gif", dir.path(), "image_001.gif")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::TooSmall(4)));
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_rejects_declared_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([(
            "https://cdn.example.com/big.png",
            MockResponse::image(PNG).with_content_length(Some(consts::MAX_IMAGE_BYTES + 1)),
        )]);
        let err = fetcher
            .fetch_image("https://cdn.example.com/big.png", dir.path(), "image_001.png")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::TooLarge(_)));
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_rejects_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([(
            "https://cdn.example.com/cut.png",
            MockResponse::image(PNG).with_content_length(Some(PNG.len() as u64 + 7)),
        )]);
        let err = fetcher
            .fetch_image("https://cdn.example.com/cut.png", dir.path(), "image_001.png")
            .await
            .unwrap_err();
        assert!(matches!(
            &*err,
            ErrorKind::LengthMismatch { expected, actual }
                if *expected == PNG.len() as u64 + 7 && *actual == PNG.len() as u64
        ));
        assert!(!dir.path().join("image_001.png").exists());
        assert_no_tmp(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_without_content_length_skips_mismatch_check() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([(
            "https://cdn.example.com/chunked.png",
            MockResponse::image(PNG).with_content_length(None),
        )]);
        fetcher
            .fetch_image("https://cdn.example.com/chunked.png", dir.path(), "image_001.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_unknown_url_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher([]);
        let err = fetcher
            .fetch_image("https://nowhere.example/x.png", dir.path(), "image_001.png")
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transport(_)));
        assert!(err.is_retryable());
    }
}
