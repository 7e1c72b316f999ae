//! Terminal-facing progress sink.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use inkfeed_offline::{Decision, Phase, ProgressSink};
use tracing::debug;

/// Progress sink for interactive terminal runs.
///
/// Ctrl-C is latched rather than acted on immediately; the download picks
/// it up at its next checkpoint, which keeps cleanup in the pipeline's
/// hands. Whether an interrupt during the image phase skips the remaining
/// images or aborts the whole download is a command line choice.
pub struct TerminalSink {
    interrupted: Arc<AtomicBool>,
    skip_on_interrupt: bool,
}

impl TerminalSink {
    pub fn new(skip_on_interrupt: bool) -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::SeqCst);
            }
        });
        Self {
            interrupted,
            skip_on_interrupt,
        }
    }
}

#[async_trait]
impl ProgressSink for TerminalSink {
    async fn progress(&self, phase: Phase, message: &str) {
        debug!(%phase, message);
        eprintln!("{message}");
    }

    async fn checkpoint(&self, phase: Phase, message: &str) -> Decision {
        eprintln!("{message}");
        // One Ctrl-C answers exactly one checkpoint.
        if self.interrupted.swap(false, Ordering::SeqCst) {
            if self.skip_on_interrupt && phase == Phase::Downloading {
                eprintln!("Interrupted; skipping the remaining images.");
                return Decision::SkipRemaining;
            }
            eprintln!("Interrupted; aborting this download.");
            return Decision::Abort;
        }
        Decision::Continue
    }

    async fn notify(&self, message: &str) {
        eprintln!("{message}");
    }

    async fn open_document(&self, path: &Path) {
        println!("{}", path.display());
    }
}
