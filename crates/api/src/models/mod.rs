//! Wire models for the aggregation server's JSON API.
//!
//! Shapes follow the Miniflux v1 payloads. Fields the reader never acts on
//! are left out and ignored during deserialization.

mod category;
mod entry;
mod feed;
mod status;

pub use category::Category;
pub use entry::{Entry, EntryPage};
pub use feed::Feed;
pub use status::EntryStatus;

use serde::Deserialize;

/// The authenticated user, used to verify credentials against `/v1/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}
