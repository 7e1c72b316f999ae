//! Offline Entry Pipeline
//!
//! Turns a feed entry fetched from the server into a self-contained HTML
//! document on disk: images discovered and downloaded next to it, markup
//! sanitized for offline reading, metadata persisted alongside. The whole
//! pipeline is driven by [`Downloader::execute`] and reports to the host
//! through a [`ProgressSink`].

pub mod error;

mod compose;
mod consts;
mod discover;
mod fetch;
mod progress;
mod sanitize;
mod workflow;

pub use compose::compose;
pub use consts::{CHECKPOINT_INTERVAL, MAX_IMAGE_BYTES, MIN_IMAGE_BYTES};
pub use discover::{Discovery, ImageRef, discover};
#[cfg(any(test, feature = "mock"))]
pub use fetch::{MockResponse, MockTransport};
pub use fetch::{Fetcher, HttpTransport, Response, Transport, TransportHandle};
pub use progress::{Decision, Phase, ProgressSink, Unattended};
pub use sanitize::{extract_content, sanitize};
pub use workflow::{DownloadOptions, Downloader, Outcome, Report};
