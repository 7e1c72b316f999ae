//! Metadata sidecars: one `metadata.json` next to each rendered entry.
//!
//! The sidecar is the only record of where an entry came from and whether
//! it has been read, so the reader keeps working when the server is
//! unreachable. There is deliberately no central index; the filesystem is
//! the database.

use crate::error::{ErrorKind, Result, map_io_error};
use crate::layout::Layout;
use exn::ResultExt;
use inkfeed_api::{Entry, EntryStatus};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Feed identity kept with a downloaded entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedRef {
    pub id: i64,
    pub title: String,
}

/// Category identity kept with a downloaded entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryRef {
    pub id: i64,
    pub title: String,
}

/// Everything the reader needs to know about a downloaded entry without
/// opening the HTML: identity, provenance and read-state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryMetadata {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub status: EntryStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub feed: FeedRef,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    /// Whether image downloading was enabled when the entry was saved.
    pub images_included: bool,
    /// Number of images stored alongside the document.
    pub images_count: u32,
}

impl EntryMetadata {
    /// Capture the sidecar for `entry` as it was downloaded.
    pub fn capture(entry: &Entry, images_included: bool, images_count: u32) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            url: entry.url.clone(),
            status: entry.status,
            published_at: entry.published_at,
            feed: FeedRef { id: entry.feed.id, title: entry.feed.title.clone() },
            category: entry
                .feed
                .category
                .as_ref()
                .map(|category| CategoryRef { id: category.id, title: category.title.clone() }),
            images_included,
            images_count,
        }
    }
}

/// Reads and writes metadata sidecars under a [`Layout`].
#[derive(Debug, Clone)]
pub struct SidecarStore {
    layout: Layout,
}

impl SidecarStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Whether the entry's rendered document exists on disk.
    pub async fn downloaded(&self, id: i64) -> bool {
        fs::try_exists(self.layout.html_file(id)).await.unwrap_or(false)
    }

    /// Write the sidecar, replacing any previous one.
    #[instrument(skip_all, fields(entry = metadata.id))]
    pub async fn save(&self, metadata: &EntryMetadata) -> Result<()> {
        let path = self.layout.sidecar_file(metadata.id);
        let json = serde_json::to_vec_pretty(metadata).or_raise(|| ErrorKind::Encode)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| map_io_error(e, &path))?;
        }
        fs::write(&path, &json).await.map_err(|e| map_io_error(e, &path))?;
        Ok(())
    }

    /// Read the sidecar for `id`.
    ///
    /// Missing and malformed sidecars both come back as `Ok(None)`; a
    /// stale or hand-edited file must never wedge the rest of the library.
    pub async fn load(&self, id: i64) -> Result<Option<EntryMetadata>> {
        let path = self.layout.sidecar_file(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(exn::Exn::from(map_io_error(e, &path))),
        };
        match serde_json::from_slice::<EntryMetadata>(&bytes) {
            Ok(metadata) if metadata.id == id => Ok(Some(metadata)),
            Ok(metadata) => {
                warn!(found = metadata.id, expected = id, "sidecar ID does not match its directory");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed sidecar");
                Ok(None)
            }
        }
    }

    /// Update the read-state recorded in the sidecar.
    ///
    /// Returns `false` when the entry has no sidecar to update; one is
    /// never created here. Writing is skipped when the status already
    /// matches.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: i64, status: EntryStatus) -> Result<bool> {
        let Some(mut metadata) = self.load(id).await? else {
            return Ok(false);
        };
        if metadata.status == status {
            return Ok(true);
        }
        metadata.status = status;
        self.save(&metadata).await?;
        Ok(true)
    }

    /// Delete a downloaded entry: document, sidecar, images, directory.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if the entry was never downloaded.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let dir = self.layout.entry_dir(id);
        fs::remove_dir_all(&dir).await.map_err(|e| map_io_error(e, &dir))?;
        debug!(entry = id, "deleted local entry");
        Ok(())
    }
}
