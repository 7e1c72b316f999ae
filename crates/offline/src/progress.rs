//! Progress reporting and cooperative cancellation.
//!
//! The download workflow never talks to a screen directly. Everything a
//! user sees, and every chance they get to cancel, goes through a
//! [`ProgressSink`] supplied by the host.

use std::path::Path;

use async_trait::async_trait;
use derive_more::Display;
use tracing::{debug, info};

/// Phases of a download, in the order they run.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[display("preparing")]
    Preparing,
    #[display("downloading")]
    Downloading,
    #[display("processing")]
    Processing,
    #[display("completing")]
    Completing,
}

/// Answer to a cancellation checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    /// Keep going.
    #[default]
    Continue,
    /// Stop fetching further images but finish the document with whatever
    /// arrived so far. Only meaningful while images are downloading; at
    /// every other checkpoint it reads as [`Decision::Continue`].
    SkipRemaining,
    /// Stop entirely. Everything written for this entry is removed.
    Abort,
}

/// Host-side surface for progress, notifications and cancellation.
///
/// Implementations back this with whatever the host offers: a status bar,
/// a dialog, or nothing at all (see [`Unattended`]). Checkpoints are the
/// only places a download can be cancelled, so an implementation that
/// blocks in [`checkpoint`](ProgressSink::checkpoint) stalls the whole
/// pipeline; answer quickly.
///
/// ```no_run
/// use std::path::Path;
/// use async_trait::async_trait;
/// use inkfeed_offline::{Decision, Phase, ProgressSink};
///
/// struct StatusLine;
///
/// #[async_trait]
/// impl ProgressSink for StatusLine {
///     async fn progress(&self, _phase: Phase, message: &str) {
///         eprintln!("{message}");
///     }
///
///     async fn checkpoint(&self, _phase: Phase, message: &str) -> Decision {
///         eprintln!("{message}");
///         Decision::Continue
///     }
///
///     async fn notify(&self, message: &str) {
///         eprintln!("{message}");
///     }
///
///     async fn open_document(&self, path: &Path) {
///         println!("{}", path.display());
///     }
/// }
/// ```
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Lightweight status refresh. Shown often; must not prompt.
    async fn progress(&self, phase: Phase, message: &str);

    /// Status update that doubles as a cancellation poll.
    async fn checkpoint(&self, phase: Phase, message: &str) -> Decision;

    /// One-off message that outlives the progress display, for results
    /// and failures.
    async fn notify(&self, message: &str);

    /// Hand the finished document over for display.
    async fn open_document(&self, path: &Path);
}

/// Sink for headless runs: never cancels, reports through tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

#[async_trait]
impl ProgressSink for Unattended {
    async fn progress(&self, phase: Phase, message: &str) {
        debug!(%phase, message);
    }

    async fn checkpoint(&self, phase: Phase, message: &str) -> Decision {
        debug!(%phase, message);
        Decision::Continue
    }

    async fn notify(&self, message: &str) {
        info!(message);
    }

    async fn open_document(&self, path: &Path) {
        info!(path = %path.display(), "document ready");
    }
}
