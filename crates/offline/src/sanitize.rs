//! Stripping entry HTML down to what works offline.

use crate::consts;
use scraper::Html;
use tracing::instrument;

/// Remove elements that are useless or actively broken without a network:
/// scripts, embedded players, frames, forms and stylesheet blocks.
///
/// Inline `style` attributes survive; only `<style>` elements go. The
/// function is total: input that matches nothing comes back unchanged.
#[instrument(skip(html), fields(html_size = html.len()))]
pub fn sanitize(html: &str) -> String {
    let mut cleaned = html.to_string();
    for (paired, unpaired) in consts::BLOCKED_PATTERNS.iter() {
        cleaned = paired.replace_all(&cleaned, "").into_owned();
        // Orphan opening or closing tags left over from truncated feeds.
        cleaned = unpaired.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Narrow a full web page to its main content container.
///
/// Feeds occasionally carry entire pages, navigation and all. Containers
/// are tried in a fixed order and the first one with a substantial amount
/// of content wins. Returns `None` when nothing qualifies, in which case
/// callers should keep the document as-is; losing content is worse than
/// keeping chrome.
#[instrument(skip(html), fields(html_size = html.len()))]
pub fn extract_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector in consts::CONTENT_SELECTORS.iter() {
        if let Some(element) = document.select(selector).next() {
            let inner = element.inner_html();
            if inner.trim().len() >= consts::CONTENT_MIN_LEN {
                return Some(inner);
            }
        }
    }
    None
}
