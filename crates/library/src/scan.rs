//! Listing downloaded entries.

use crate::error::{Result, map_io_error};
use crate::sidecar::{EntryMetadata, SidecarStore};
use async_stream::stream;
use futures::Stream;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, trace};

/// One downloaded entry found under the library root.
#[derive(Debug)]
pub struct LocalEntry {
    pub id: i64,
    /// Path to the rendered document.
    pub html_file: PathBuf,
    /// Sidecar contents; `None` when the sidecar is missing or malformed.
    pub metadata: Option<EntryMetadata>,
}

impl SidecarStore {
    /// Walk the library root and yield every downloaded entry.
    ///
    /// Directories whose name is not an entry ID are ignored, as are
    /// directories without a rendered document (half-finished downloads).
    /// No ordering is guaranteed.
    pub fn scan(&self) -> impl Stream<Item = Result<LocalEntry>> + '_ {
        stream! {
            let root = self.layout().root().to_path_buf();
            let mut entries = match fs::read_dir(&root).await {
                Ok(entries) => entries,
                // An empty (never-created) library is not an error.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    yield Err(exn::Exn::from(map_io_error(e, &root)));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(exn::Exn::from(map_io_error(e, &root)));
                        break;
                    }
                };
                match entry.file_type().await {
                    Ok(file_type) if file_type.is_dir() => {}
                    Ok(_) => {
                        trace!(name = ?entry.file_name(), "ignoring non-directory in library root");
                        continue;
                    }
                    Err(e) => {
                        yield Err(exn::Exn::from(map_io_error(e, &entry.path())));
                        continue;
                    }
                }
                let Some(id) = entry.file_name().to_str().and_then(|name| name.parse::<i64>().ok())
                else {
                    trace!(name = ?entry.file_name(), "ignoring foreign directory in library root");
                    continue;
                };
                let html_file = self.layout().html_file(id);
                match fs::try_exists(&html_file).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(entry = id, "skipping directory without a rendered document");
                        continue;
                    }
                    Err(e) => {
                        yield Err(exn::Exn::from(map_io_error(e, &html_file)));
                        continue;
                    }
                }
                match self.load(id).await {
                    Ok(metadata) => yield Ok(LocalEntry { id, html_file, metadata }),
                    Err(e) => yield Err(e),
                }
            }
        }
    }
}
