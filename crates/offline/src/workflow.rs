//! The download pipeline.
//!
//! One entry moves through four phases: prepare the directory, fetch the
//! images one at a time, rewrite and sanitize the content into a single
//! document, and persist the metadata sidecar. The user can cancel at
//! fixed checkpoints; aborting removes the entry directory entirely,
//! while fatal errors leave partial state in place.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use exn::ResultExt;
use inkfeed_api::models::Entry;
use inkfeed_library::{EntryMetadata, SidecarStore};
use tokio::fs;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::compose::compose;
use crate::consts;
use crate::discover::{Discovery, ImageRef, discover, normalize_src, src_attr};
use crate::error::{ErrorKind, Result};
use crate::fetch::Fetcher;
use crate::progress::{Decision, Phase, ProgressSink};
use crate::sanitize::{extract_content, sanitize};

/// Per-run switches, typically seeded from configuration.
#[derive(Debug, Clone, Copy)]
pub struct DownloadOptions {
    /// Fetch referenced images and point the document at the local
    /// copies. When off, every `<img>` tag is dropped instead.
    pub include_images: bool,
    /// Narrow full-page HTML to its main content container before
    /// composing, when one can be found.
    pub extract_content: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            extract_content: false,
        }
    }
}

/// Tally of what a completed download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Where the finished document lives.
    pub path: PathBuf,
    pub images_total: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    /// Discovered but never attempted: images are disabled, or the user
    /// chose to skip the rest.
    pub images_skipped: usize,
}

/// Terminal states of [`Downloader::execute`].
#[derive(Debug)]
pub enum Outcome {
    /// A finished document was already on disk; nothing was fetched.
    AlreadyDownloaded(PathBuf),
    /// The full pipeline ran and the document is on disk.
    Completed(Report),
    /// The user aborted during the named phase. The entry directory is
    /// gone afterwards.
    Cancelled(Phase),
    /// Something fatal happened. The user was told through the sink, and
    /// partial files are left where they were.
    Failed,
}

enum LoopExit {
    Finished,
    SkippedRest,
    Aborted,
}

/// Drives the whole pipeline for one entry at a time.
///
/// Work is strictly sequential: images download one by one, in discovery
/// order, yielding to the runtime between fetches so a host event loop
/// stays responsive. Cancellation is cooperative and can only be observed
/// at checkpoints, so its latency is bounded by one fetch timeout plus
/// the checkpoint throttle.
pub struct Downloader {
    store: SidecarStore,
    fetcher: Fetcher,
    options: DownloadOptions,
    before_open: Option<Box<dyn Fn() + Send + Sync>>,
    checkpoint_interval: Duration,
}

impl Downloader {
    pub fn new(store: SidecarStore, fetcher: Fetcher, options: DownloadOptions) -> Self {
        Self {
            store,
            fetcher,
            options,
            before_open: None,
            checkpoint_interval: consts::CHECKPOINT_INTERVAL,
        }
    }

    /// Register a hook that runs right before the finished document is
    /// handed to the sink. Hosts use it to get their own chrome out of
    /// the way first.
    pub fn before_open(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_open = Some(Box::new(hook));
        self
    }

    /// Run the full pipeline for one entry.
    ///
    /// Never returns an error: fatal problems are reported through the
    /// sink's notifications and collapse into [`Outcome::Failed`].
    #[instrument(skip(self, entry, sink), fields(entry_id = entry.id))]
    pub async fn execute(&self, entry: &Entry, sink: &dyn ProgressSink) -> Outcome {
        match self.run(entry, sink).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "download failed");
                sink.notify(&format!("Download failed: {}.", &*err)).await;
                Outcome::Failed
            }
        }
    }

    async fn run(&self, entry: &Entry, sink: &dyn ProgressSink) -> Result<Outcome> {
        // Rejections happen before any directory or network I/O.
        if entry.id <= 0 {
            exn::bail!(ErrorKind::InvalidEntryId);
        }
        if !entry.has_body() {
            exn::bail!(ErrorKind::EmptyEntry(entry.id));
        }

        if self.store.downloaded(entry.id).await {
            let path = self.store.layout().html_file(entry.id);
            debug!(path = %path.display(), "entry already downloaded");
            self.open(&path, sink).await;
            return Ok(Outcome::AlreadyDownloaded(path));
        }

        if sink.checkpoint(Phase::Preparing, "Preparing download...").await == Decision::Abort {
            return Ok(self.cancel(entry.id, Phase::Preparing, sink).await);
        }
        let entry_dir = self.store.layout().entry_dir(entry.id);
        fs::create_dir_all(&entry_dir)
            .await
            .or_raise(|| ErrorKind::Prepare)?;

        // Discovery is local string work; no checkpoint on the way.
        let base = Url::parse(&entry.url).ok();
        let body = entry.body();
        let mut discovery = discover(body, base.as_ref());
        let images_total = discovery.len();

        if self.options.include_images && !discovery.is_empty() {
            match self.download_images(&entry_dir, &mut discovery, sink).await {
                LoopExit::Aborted => {
                    return Ok(self.cancel(entry.id, Phase::Downloading, sink).await);
                }
                LoopExit::Finished | LoopExit::SkippedRest => {}
            }
            let failed = discovery.failed_count();
            if failed > 0 {
                let downloaded = discovery.downloaded_count();
                sink.notify(&format!(
                    "Some images failed to download ({downloaded}/{} successful).",
                    downloaded + failed,
                ))
                .await;
            }
        }

        if sink.checkpoint(Phase::Processing, "Processing content...").await == Decision::Abort {
            return Ok(self.cancel(entry.id, Phase::Processing, sink).await);
        }

        let document = self.render(entry, body, &discovery, base.as_ref());
        let html_file = self.store.layout().html_file(entry.id);
        fs::write(&html_file, document.as_bytes())
            .await
            .or_raise(|| ErrorKind::WriteDocument)?;

        let images_downloaded = discovery.downloaded_count();
        let metadata =
            EntryMetadata::capture(entry, self.options.include_images, images_downloaded as u32);
        // A sidecar failure leaves the document in place; only an explicit
        // abort rolls anything back.
        self.store.save(&metadata).await.or_raise(|| ErrorKind::Sidecar)?;

        sink.progress(Phase::Completing, "Finishing up...").await;
        if self.options.include_images && images_total > 0 {
            sink.notify(&format!(
                "Download finished: {images_downloaded} of {images_total} images included.",
            ))
            .await;
        } else {
            sink.notify("Download finished.").await;
        }
        self.open(&html_file, sink).await;

        let images_failed = discovery.failed_count();
        Ok(Outcome::Completed(Report {
            path: html_file,
            images_total,
            images_downloaded,
            images_failed,
            images_skipped: images_total - images_downloaded - images_failed,
        }))
    }

    /// Fetch every planned image, one at a time, in discovery order.
    ///
    /// Individual failures are recorded on the image and never stop the
    /// loop. Cancellation prompts are throttled to one per
    /// `checkpoint_interval`; iterations in between emit a lightweight
    /// progress refresh instead.
    async fn download_images(
        &self,
        dir: &Path,
        discovery: &mut Discovery,
        sink: &dyn ProgressSink,
    ) -> LoopExit {
        let total = discovery.len();
        let mut last_checkpoint = Instant::now();
        for position in 0..total {
            let message = format!("Downloading image {} of {total}...", position + 1);
            if last_checkpoint.elapsed() >= self.checkpoint_interval {
                match sink.checkpoint(Phase::Downloading, &message).await {
                    Decision::Continue => {}
                    Decision::SkipRemaining => return LoopExit::SkippedRest,
                    Decision::Abort => return LoopExit::Aborted,
                }
                last_checkpoint = Instant::now();
            } else {
                sink.progress(Phase::Downloading, &message).await;
            }

            let image = &mut discovery.images_mut()[position];
            match self.fetcher.fetch_image(&image.src, dir, &image.filename).await {
                Ok(()) => image.downloaded = true,
                Err(err) => {
                    warn!(src = %image.src, error = %err, "image fetch failed");
                    image.failure = Some((*err).to_string());
                }
            }
            // Give a single-threaded host a chance to repaint.
            tokio::task::yield_now().await;
        }
        LoopExit::Finished
    }

    fn render(&self, entry: &Entry, body: &str, discovery: &Discovery, base: Option<&Url>) -> String {
        // Rewrite runs on the exact text discovery indexed. Narrowing
        // re-serializes the DOM and entity-encodes attribute values, so a
        // src like `?w=640&h=480` would no longer match its plan entry.
        let rewritten = rewrite_images(body, discovery, self.options.include_images, base);
        let narrowed = if self.options.extract_content {
            extract_content(&rewritten)
        } else {
            None
        };
        let content = narrowed.as_deref().unwrap_or(&rewritten);
        compose(entry, &sanitize(content))
    }

    async fn open(&self, path: &Path, sink: &dyn ProgressSink) {
        if let Some(hook) = &self.before_open {
            hook();
        }
        sink.open_document(path).await;
    }

    async fn cancel(&self, id: i64, phase: Phase, sink: &dyn ProgressSink) -> Outcome {
        self.purge(id).await;
        sink.notify("Download cancelled.").await;
        Outcome::Cancelled(phase)
    }

    /// Remove the entry directory and everything inside it.
    async fn purge(&self, id: i64) {
        let dir = self.store.layout().entry_dir(id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(dir = %dir.display(), "removed partial download"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "could not remove partial download");
            }
        }
    }
}

/// Rewrite `<img>` tags against the download plan.
///
/// Tags whose image made it to disk point at the local filename, keeping
/// declared dimensions as an inline style. Tags whose image failed or was
/// never attempted are dropped rather than left pointing at the network.
/// With images disabled every tag is dropped. Tags discovery could not
/// resolve to a fetchable URL stay untouched.
pub(crate) fn rewrite_images(
    html: &str,
    discovery: &Discovery,
    include_images: bool,
    base: Option<&Url>,
) -> String {
    consts::IMG_TAG_REGEX
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let tag = &caps[0];
            if !include_images {
                return String::new();
            }
            let resolved = src_attr(tag).and_then(|src| normalize_src(&src, base));
            let Some(src) = resolved else {
                // Inline data URIs and friends render fine offline.
                return tag.to_string();
            };
            match discovery.get(&src) {
                Some(image) if image.downloaded => local_img_tag(image),
                _ => String::new(),
            }
        })
        .into_owned()
}

fn local_img_tag(image: &ImageRef) -> String {
    let style = match (image.width, image.height) {
        (Some(w), Some(h)) => format!(" style=\"width:{w}px;height:{h}px;\""),
        (Some(w), None) => format!(" style=\"width:{w}px;\""),
        (None, Some(h)) => format!(" style=\"height:{h}px;\""),
        (None, None) => String::new(),
    };
    format!("<img src=\"{}\"{style}/>", image.filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{MockResponse, MockTransport};
    use async_trait::async_trait;
    use inkfeed_api::models::{EntryStatus, Feed};
    use inkfeed_library::Layout;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use time::macros::datetime;

    const PNG_BYTES: &[u8] = b"png-bytes-0123456789";
    const JPG_BYTES: &[u8] = b"jpg-bytes-0123456789";

    const BODY: &str = r#"<p>Reflowing text for slow panels.</p>
<img src="https://img.example.com/one.png" width="640" height="480">
<img src="https://img.example.com/two.jpg">
<p>More text.</p>"#;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Progress(Phase, String),
        Checkpoint(Phase, String),
        Notify(String),
        Opened(PathBuf),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
        decisions: Mutex<VecDeque<Decision>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self::default()
        }

        /// Answers checkpoints from a script, then `Continue` forever.
        fn with_decisions(decisions: impl IntoIterator<Item = Decision>) -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                decisions: Mutex::new(decisions.into_iter().collect()),
            }
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn notifications(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    Event::Notify(message) => Some(message),
                    _ => None,
                })
                .collect()
        }

        fn checkpoints(&self) -> Vec<Phase> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    Event::Checkpoint(phase, _) => Some(phase),
                    _ => None,
                })
                .collect()
        }

        fn opened(&self) -> Vec<PathBuf> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    Event::Opened(path) => Some(path),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn progress(&self, phase: Phase, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Progress(phase, message.to_string()));
        }

        async fn checkpoint(&self, phase: Phase, message: &str) -> Decision {
            self.events
                .lock()
                .unwrap()
                .push(Event::Checkpoint(phase, message.to_string()));
            self.decisions.lock().unwrap().pop_front().unwrap_or_default()
        }

        async fn notify(&self, message: &str) {
            self.events.lock().unwrap().push(Event::Notify(message.to_string()));
        }

        async fn open_document(&self, path: &Path) {
            self.events.lock().unwrap().push(Event::Opened(path.to_path_buf()));
        }
    }

    fn entry(id: i64) -> Entry {
        Entry {
            id,
            title: "Panel refresh tricks".to_string(),
            url: "https://blog.example.com/posts/panel-refresh".to_string(),
            content: BODY.to_string(),
            summary: String::new(),
            status: EntryStatus::Unread,
            published_at: datetime!(2024-06-01 08:00 UTC),
            feed: Feed {
                id: 3,
                title: "Panel Notes".to_string(),
                site_url: String::new(),
                category: None,
            },
        }
    }

    fn two_image_transport() -> MockTransport {
        MockTransport::with_responses([
            ("https://img.example.com/one.png", MockResponse::image(PNG_BYTES)),
            ("https://img.example.com/two.jpg", MockResponse::image(JPG_BYTES)),
        ])
    }

    /// Downloader over a scripted transport, checkpointing on every image.
    fn downloader_with(
        root: &Path,
        transport: Arc<MockTransport>,
        options: DownloadOptions,
    ) -> Downloader {
        let store = SidecarStore::new(Layout::new(root).unwrap());
        let mut downloader = Downloader::new(store, Fetcher::new(transport), options);
        downloader.checkpoint_interval = Duration::ZERO;
        downloader
    }

    #[tokio::test]
    async fn test_execute_happy_path() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::new();

        let outcome = downloader.execute(&entry(42), &sink).await;

        let Outcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.images_total, 2);
        assert_eq!(report.images_downloaded, 2);
        assert_eq!(report.images_failed, 0);
        assert_eq!(report.images_skipped, 0);
        assert_eq!(report.path, dir.path().join("42").join("entry.html"));

        let document = std::fs::read_to_string(&report.path).unwrap();
        assert!(
            document.contains(r#"<img src="image_001.png" style="width:640px;height:480px;"/>"#)
        );
        assert!(document.contains(r#"<img src="image_002.jpg"/>"#));
        assert!(!document.contains("img.example.com"));
        assert!(document.contains("Panel refresh tricks"));

        assert!(dir.path().join("42").join("image_001.png").exists());
        assert!(dir.path().join("42").join("image_002.jpg").exists());
        let metadata = std::fs::read_to_string(dir.path().join("42").join("metadata.json")).unwrap();
        assert!(metadata.contains("\"images_included\": true"));
        assert!(metadata.contains("\"images_count\": 2"));

        assert_eq!(sink.opened(), vec![report.path.clone()]);
        assert_eq!(
            sink.notifications(),
            vec!["Download finished: 2 of 2 images included."]
        );
    }

    #[tokio::test]
    async fn test_execute_short_circuits_when_already_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());

        downloader.execute(&entry(42), &RecordingSink::new()).await;
        assert_eq!(transport.requests().len(), 2);

        let second = RecordingSink::new();
        let outcome = downloader.execute(&entry(42), &second).await;

        let Outcome::AlreadyDownloaded(path) = outcome else {
            panic!("expected cache hit, got {outcome:?}");
        };
        assert!(path.ends_with("42/entry.html"));
        // No new fetches, no checkpoints; just the hand-off.
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(second.opened(), vec![path]);
        assert!(second.checkpoints().is_empty());
    }

    #[tokio::test]
    async fn test_execute_with_images_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::default());
        let options = DownloadOptions {
            include_images: false,
            ..DownloadOptions::default()
        };
        let downloader = downloader_with(dir.path(), transport.clone(), options);
        let sink = RecordingSink::new();

        let outcome = downloader.execute(&entry(7), &sink).await;

        let Outcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert!(transport.requests().is_empty());
        assert_eq!(report.images_downloaded, 0);
        assert_eq!(report.images_skipped, 2);

        let document = std::fs::read_to_string(&report.path).unwrap();
        assert!(!document.contains("<img"));
        assert!(document.contains("Reflowing text"));

        let metadata = std::fs::read_to_string(dir.path().join("7").join("metadata.json")).unwrap();
        assert!(metadata.contains("\"images_included\": false"));
        assert!(metadata.contains("\"images_count\": 0"));
        assert_eq!(sink.notifications(), vec!["Download finished."]);
    }

    #[tokio::test]
    async fn test_execute_with_content_extraction_keeps_local_images() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::with_responses([(
            "https://img.example.com/chart.png?w=640&h=480",
            MockResponse::image(PNG_BYTES),
        )]));
        let options = DownloadOptions {
            extract_content: true,
            ..DownloadOptions::default()
        };
        let downloader = downloader_with(dir.path(), transport.clone(), options);
        let sink = RecordingSink::new();

        // A whole page, chrome and all, with a multi-parameter image URL
        // inside the article. Narrowing re-encodes `&` as `&amp;` in
        // attributes, so the rewrite must not run on the narrowed text.
        let filler =
            "<p>substantial article text, repeated to pass the length gate.</p>\n".repeat(10);
        let mut page = entry(91);
        page.content = format!(
            r#"<html><body><nav>site menu</nav><article>{filler}<img src="https://img.example.com/chart.png?w=640&h=480"></article><footer>colophon</footer></body></html>"#
        );

        let outcome = downloader.execute(&page, &sink).await;

        let Outcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.images_total, 1);
        assert_eq!(report.images_downloaded, 1);
        assert_eq!(
            transport.requests(),
            vec!["https://img.example.com/chart.png?w=640&h=480"]
        );
        assert!(dir.path().join("91").join("image_001.png").exists());

        let document = std::fs::read_to_string(&report.path).unwrap();
        assert!(!document.contains("site menu"), "chrome must be narrowed away");
        assert!(document.contains("substantial article text"));
        assert!(
            document.contains(r#"src="image_001.png""#),
            "downloaded image must still be referenced: {document}"
        );
        assert!(!document.contains("img.example.com"));
        assert_eq!(
            sink.notifications(),
            vec!["Download finished: 1 of 1 images included."]
        );
    }

    #[tokio::test]
    async fn test_execute_keeps_going_after_image_failures() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::with_responses([
            (
                "https://img.example.com/one.png",
                MockResponse::image(PNG_BYTES).with_status(404),
            ),
            ("https://img.example.com/two.jpg", MockResponse::image(JPG_BYTES)),
        ]));
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::new();

        let outcome = downloader.execute(&entry(42), &sink).await;

        let Outcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.images_downloaded, 1);
        assert_eq!(report.images_failed, 1);
        assert_eq!(transport.requests().len(), 2, "failure must not stop the loop");

        let document = std::fs::read_to_string(&report.path).unwrap();
        // The failed image is dropped outright, not left pointing at the
        // network.
        assert!(!document.contains("image_001"));
        assert!(!document.contains("img.example.com"));
        assert!(document.contains(r#"<img src="image_002.jpg"/>"#));

        assert_eq!(
            sink.notifications(),
            vec![
                "Some images failed to download (1/2 successful).",
                "Download finished: 1 of 2 images included.",
            ]
        );
        assert_eq!(sink.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_rejects_entry_without_content() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::default());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::new();

        let mut empty = entry(9);
        empty.content = String::new();
        empty.summary = String::new();

        let outcome = downloader.execute(&empty, &sink).await;

        assert!(matches!(outcome, Outcome::Failed));
        assert!(transport.requests().is_empty());
        assert!(!dir.path().join("9").exists(), "no directory for rejected entries");
        assert_eq!(
            sink.notifications(),
            vec!["Download failed: entry 9 has no content to download."]
        );
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_id() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader_with(
            dir.path(),
            Arc::new(MockTransport::default()),
            DownloadOptions::default(),
        );
        let sink = RecordingSink::new();

        for id in [0, -3] {
            let outcome = downloader.execute(&entry(id), &sink).await;
            assert!(matches!(outcome, Outcome::Failed), "id {id}");
        }
        assert_eq!(sink.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_abort_at_preparing_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::with_decisions([Decision::Abort]);

        let outcome = downloader.execute(&entry(42), &sink).await;

        assert!(matches!(outcome, Outcome::Cancelled(Phase::Preparing)));
        assert!(transport.requests().is_empty());
        assert!(!dir.path().join("42").exists());
        assert_eq!(sink.notifications(), vec!["Download cancelled."]);
    }

    #[tokio::test]
    async fn test_abort_while_downloading_purges_directory() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::with_decisions([
            Decision::Continue, // preparing
            Decision::Continue, // image one
            Decision::Abort,    // image two
        ]);

        let outcome = downloader.execute(&entry(42), &sink).await;

        assert!(matches!(outcome, Outcome::Cancelled(Phase::Downloading)));
        assert_eq!(transport.requests(), vec!["https://img.example.com/one.png"]);
        assert!(!dir.path().join("42").exists(), "partial directory must be purged");
    }

    #[tokio::test]
    async fn test_abort_at_processing_purges_directory() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::with_decisions([
            Decision::Continue, // preparing
            Decision::Continue, // image one
            Decision::Continue, // image two
            Decision::Abort,    // processing
        ]);

        let outcome = downloader.execute(&entry(42), &sink).await;

        assert!(matches!(outcome, Outcome::Cancelled(Phase::Processing)));
        assert_eq!(transport.requests().len(), 2);
        assert!(!dir.path().join("42").exists());
    }

    #[tokio::test]
    async fn test_skip_remaining_finishes_with_partial_images() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let downloader = downloader_with(dir.path(), transport.clone(), DownloadOptions::default());
        let sink = RecordingSink::with_decisions([
            Decision::Continue,      // preparing
            Decision::Continue,      // image one
            Decision::SkipRemaining, // image two
        ]);

        let outcome = downloader.execute(&entry(42), &sink).await;

        let Outcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.images_downloaded, 1);
        assert_eq!(report.images_failed, 0);
        assert_eq!(report.images_skipped, 1);
        assert_eq!(transport.requests(), vec!["https://img.example.com/one.png"]);

        let document = std::fs::read_to_string(&report.path).unwrap();
        assert!(document.contains("image_001.png"));
        // The skipped image disappears from the document.
        assert!(!document.contains("two.jpg"));
    }

    #[tokio::test]
    async fn test_checkpoints_are_throttled() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(two_image_transport());
        let store = SidecarStore::new(Layout::new(dir.path()).unwrap());
        // Default wall-clock throttle; mock fetches return instantly, so
        // the image loop never reaches a cancellation prompt.
        let downloader = Downloader::new(store, Fetcher::new(transport), DownloadOptions::default());
        let sink = RecordingSink::new();

        downloader.execute(&entry(42), &sink).await;

        assert_eq!(sink.checkpoints(), vec![Phase::Preparing, Phase::Processing]);
        let refreshes = sink
            .events()
            .into_iter()
            .filter(|event| matches!(event, Event::Progress(Phase::Downloading, _)))
            .count();
        assert_eq!(refreshes, 2, "one lightweight refresh per image");
    }

    #[tokio::test]
    async fn test_before_open_hook_runs() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::default());
        let options = DownloadOptions {
            include_images: false,
            ..DownloadOptions::default()
        };
        let flag = Arc::new(AtomicBool::new(false));
        let seen = flag.clone();
        let store = SidecarStore::new(Layout::new(dir.path()).unwrap());
        let downloader = Downloader::new(store, Fetcher::new(transport), options)
            .before_open(move || seen.store(true, Ordering::SeqCst));
        let sink = RecordingSink::new();

        let outcome = downloader.execute(&entry(42), &sink).await;

        assert!(matches!(outcome, Outcome::Completed(_)));
        assert!(flag.load(Ordering::SeqCst), "hook must run before hand-off");
        assert_eq!(sink.opened().len(), 1);
    }

    #[test]
    fn test_rewrite_drops_unknown_and_keeps_data_uris() {
        let base = Url::parse("https://blog.example.com/posts/1").unwrap();
        let html = r#"<img src="data:image/png;base64,AAAA"><img src="/a.png">"#;
        let mut discovery = discover(html, Some(&base));
        discovery.images_mut()[0].downloaded = true;

        let out = rewrite_images(html, &discovery, true, Some(&base));

        assert!(out.contains("data:image/png"));
        assert!(out.contains(r#"<img src="image_001.png"/>"#));
        assert!(!out.contains("/a.png"));
    }

    #[test]
    fn test_rewrite_with_images_disabled_drops_every_tag() {
        let html = r#"text <img src="data:image/png;base64,AAAA"> tail"#;
        let out = rewrite_images(html, &Discovery::default(), false, None);
        assert_eq!(out, "text  tail");
    }

    #[test]
    fn test_rewrite_keeps_partial_dimensions() {
        let base = Url::parse("https://blog.example.com/").unwrap();
        let html = r#"<img src="/a.png" width="200">"#;
        let mut discovery = discover(html, Some(&base));
        discovery.images_mut()[0].downloaded = true;

        let out = rewrite_images(html, &discovery, true, Some(&base));

        assert_eq!(out, r#"<img src="image_001.png" style="width:200px;"/>"#);
    }
}
