//! Query parameters for entry listings.

use crate::models::EntryStatus;
use url::Url;

/// Sort key accepted by the entry listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    PublishedAt,
    CreatedAt,
    Id,
}

impl Order {
    fn as_str(&self) -> &'static str {
        match self {
            Order::PublishedAt => "published_at",
            Order::CreatedAt => "created_at",
            Order::Id => "id",
        }
    }
}

/// Sort direction accepted by the entry listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Filters for an entry listing request.
///
/// `None` fields are omitted from the request so the server applies its
/// own defaults. Newest-first by publication date unless overridden.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub status: Option<EntryStatus>,
    pub order: Option<Order>,
    pub direction: Option<Direction>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EntryQuery {
    /// Append the set filters as query parameters on `url`.
    pub(crate) fn apply(&self, url: &mut Url) {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        if let Some(direction) = self.direction {
            pairs.push(("direction", direction.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        // Calling query_pairs_mut unconditionally leaves a dangling `?`
        // on URLs that end up with no parameters.
        if pairs.is_empty() {
            return;
        }
        let mut serializer = url.query_pairs_mut();
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_adds_nothing() {
        let mut url = Url::parse("https://reader.example.com/v1/entries").unwrap();
        EntryQuery::default().apply(&mut url);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_full_query() {
        let mut url = Url::parse("https://reader.example.com/v1/entries").unwrap();
        let query = EntryQuery {
            status: Some(EntryStatus::Unread),
            order: Some(Order::PublishedAt),
            direction: Some(Direction::Desc),
            limit: Some(25),
            offset: Some(50),
        };
        query.apply(&mut url);
        assert_eq!(
            url.query(),
            Some("status=unread&order=published_at&direction=desc&limit=25&offset=50")
        );
    }
}
