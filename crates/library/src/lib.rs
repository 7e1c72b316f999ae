pub mod error;
mod layout;
mod scan;
mod sidecar;

pub use crate::layout::{HTML_FILE, Layout, SIDECAR_FILE};
pub use crate::scan::LocalEntry;
pub use crate::sidecar::{CategoryRef, EntryMetadata, FeedRef, SidecarStore};
