//! Command line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inkfeed_api::models::EntryStatus;

#[derive(Debug, Parser)]
#[command(name = "inkfeed", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, env = "INKFEED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify the server connection and credentials.
    Check,
    /// List entries known to the server.
    Entries {
        /// Only entries with this status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Only entries from this feed.
        #[arg(long, conflicts_with = "category")]
        feed: Option<i64>,
        /// Only entries from this category.
        #[arg(long)]
        category: Option<i64>,
        /// Maximum number of entries to list.
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Number of entries to skip.
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// List feeds known to the server.
    Feeds,
    /// List categories known to the server.
    Categories,
    /// Download entries for offline reading.
    Download {
        /// Entry IDs to download.
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Leave images out of the downloaded documents.
        #[arg(long)]
        no_images: bool,
        /// On Ctrl-C, keep the document and skip the remaining images
        /// instead of aborting the download.
        #[arg(long)]
        skip_on_interrupt: bool,
    },
    /// List entries already downloaded to the local library.
    Local,
    /// Change an entry's status on the server and in the local library.
    Status {
        id: i64,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Remove a downloaded entry from the local library.
    Delete { id: i64 },
}

/// Entry status as a command line value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Unread,
    Read,
    Removed,
}

impl From<StatusArg> for EntryStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Unread => EntryStatus::Unread,
            StatusArg::Read => EntryStatus::Read,
            StatusArg::Removed => EntryStatus::Removed,
        }
    }
}
