use super::Category;
use serde::{Deserialize, Serialize};

/// A subscribed feed as returned by the server.
///
/// Only the fields this client acts on are kept; servers send a much
/// larger object and serde drops the rest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Feed {
    pub id: i64,
    pub title: String,
    /// Homepage of the site the feed belongs to, when the server knows it.
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub category: Option<Category>,
}
