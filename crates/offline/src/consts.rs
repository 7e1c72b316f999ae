use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;
use std::time::Duration;

/// Time allowed for establishing a connection to an image host.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for one whole image transfer.
pub const TOTAL_TIMEOUT: Duration = Duration::from_secs(30);
/// Anything smaller than this is a tracking pixel or an error page.
pub const MIN_IMAGE_BYTES: u64 = 10;
/// Anything larger than this has no business on an e-reader.
pub const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;
/// Minimum gap between cancellation checkpoints while images download.
pub const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) const USER_AGENT: &str = concat!("inkfeed/", env!("CARGO_PKG_VERSION"));

/// File extensions kept as-is; anything else is saved as `jpg`.
pub(crate) const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];
pub(crate) const DEFAULT_EXTENSION: &str = "jpg";

/// Elements that are useless or actively broken offline.
pub(crate) const BLOCKED_ELEMENTS: [&str; 7] =
    ["script", "iframe", "video", "object", "embed", "form", "style"];

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Tag-level matching stays regex-based: entry HTML is routinely malformed
// in ways a strict parser would "repair", and the rewrite step must
// reproduce the document byte-for-byte outside the tags it touches.
// Attribute patterns demand leading whitespace so `data-src` and other
// prefixed lazy-loading attributes never pass for the real one.
regex!(IMG_TAG_REGEX, r"(?is)<img\b[^>]*>");
regex!(SRC_ATTR_REGEX, r#"(?is)\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#);
regex!(WIDTH_ATTR_REGEX, r#"(?is)\swidth\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#);
regex!(HEIGHT_ATTR_REGEX, r#"(?is)\sheight\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#);

/// Paired and unpaired removal patterns for each blocked element.
pub(crate) static BLOCKED_PATTERNS: LazyLock<Vec<(Regex, Regex)>> = LazyLock::new(|| {
    BLOCKED_ELEMENTS
        .iter()
        .map(|tag| {
            let paired = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap();
            let unpaired = Regex::new(&format!(r"(?is)</?{tag}\b[^>]*>")).unwrap();
            (paired, unpaired)
        })
        .collect()
});

/// Containers tried, in order, when narrowing a page to its main content.
pub(crate) static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "article",
        "main",
        "[role='main']",
        "div#content",
        "div.post-content",
        "div.entry-content",
        "div.article-content",
        "div.article-body",
        "div.content",
    ]
    .iter()
    .map(|css| Selector::parse(css).unwrap())
    .collect()
});

/// Extracted containers shorter than this are assumed to be navigation
/// shells and rejected.
pub(crate) const CONTENT_MIN_LEN: usize = 250;
