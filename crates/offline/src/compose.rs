//! Final document assembly.

use inkfeed_api::models::Entry;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Shown in place of a missing or whitespace-only entry title.
pub(crate) const UNTITLED: &str = "Untitled Entry";

const PUBLISHED_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Inlined so the document renders standalone. Tuned for e-ink panels:
/// high contrast, no fixed widths, wrapped preformatted text.
const STYLESHEET: &str = "\
body { font-family: serif; margin: 0.5em 1em; line-height: 1.5; }
h1 { font-size: 1.5em; margin-bottom: 0.2em; }
.entry-meta, .entry-source { color: #444; font-size: 0.85em; margin: 0.1em 0; }
.entry-source a { color: #444; word-break: break-all; }
img { max-width: 100%; height: auto; }
pre, code { white-space: pre-wrap; word-wrap: break-word; }
blockquote { margin-left: 1em; padding-left: 0.5em; border-left: 2px solid #888; }
hr { border: none; border-top: 1px solid #888; margin: 0.8em 0; }
table { border-collapse: collapse; max-width: 100%; }
td, th { border: 1px solid #888; padding: 0.2em 0.4em; }
";

/// Wrap rewritten body HTML in a complete standalone document.
///
/// The header block carries the title, the feed it came from, the
/// publication time and a link back to the original. `content` is trusted
/// to already be sanitized; everything taken from the entry itself is
/// escaped before interpolation.
pub fn compose(entry: &Entry, content: &str) -> String {
    let title = entry.title.trim();
    let title = escape_html(if title.is_empty() { UNTITLED } else { title });
    let feed = escape_html(entry.feed.title.trim());
    let url = escape_html(entry.url.trim());
    // A formatting failure only costs the date line, never the document.
    let published = entry.published_at.format(PUBLISHED_FORMAT).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<title>{title}</title>
<style>
{STYLESHEET}</style>
</head>
<body>
<div class="entry-header">
<h1>{title}</h1>
<p class="entry-meta">{feed} &#183; {published}</p>
<p class="entry-source"><a href="{url}">{url}</a></p>
</div>
<hr/>
<div class="entry-content">
{content}
</div>
</body>
</html>
"#
    )
}

/// Minimal escaping for text and double-quoted attribute positions.
pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
