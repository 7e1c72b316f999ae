use serde::{Deserialize, Serialize};

/// A feed category configured on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}
