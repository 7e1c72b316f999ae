pub mod error;
pub mod models;
mod client;
mod query;

pub use crate::client::Client;
pub use crate::models::{Category, Entry, EntryPage, EntryStatus, Feed, User};
pub use crate::query::{Direction, EntryQuery, Order};
