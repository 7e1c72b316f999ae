use super::{EntryStatus, Feed};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single article as returned by the aggregation server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    /// Link to the article on the original site.
    pub url: String,
    /// Full article HTML. Empty when the feed only carries excerpts
    /// and the server has not fetched the original content.
    #[serde(default)]
    pub content: String,
    /// Short excerpt, present on some servers alongside `content`.
    #[serde(default)]
    pub summary: String,
    pub status: EntryStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub feed: Feed,
}

impl Entry {
    /// HTML used for offline rendering: the full content when present,
    /// otherwise the summary.
    pub fn body(&self) -> &str {
        if self.content.trim().is_empty() { &self.summary } else { &self.content }
    }

    /// Whether there is anything at all to render offline.
    pub fn has_body(&self) -> bool {
        !self.body().trim().is_empty()
    }
}

/// One page of an entry listing, with the total across all pages.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryPage {
    pub total: u64,
    pub entries: Vec<Entry>,
}
