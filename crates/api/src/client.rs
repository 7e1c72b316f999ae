//! HTTP client for the aggregation server's v1 REST API.
//!
//! Authentication is a static API token sent in the `X-Auth-Token` header
//! on every request, the way Miniflux and its clones expect it.

use crate::error::{ErrorKind, Result};
use crate::models::{Category, Entry, EntryPage, EntryStatus, Feed, User};
use crate::query::EntryQuery;
use exn::ResultExt;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Header carrying the API token.
const AUTH_HEADER: &str = "X-Auth-Token";
/// Time allowed for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Hard ceiling on redirect chains.
const MAX_REDIRECTS: usize = 10;
const USER_AGENT: &str = concat!("inkfeed/", env!("CARGO_PKG_VERSION"));

/// Client for one server, holding the base URL and credentials.
///
/// Cheap to clone; the underlying connection pool is shared.
///
/// # Examples
///
/// ```no_run
/// use inkfeed_api::{Client, EntryQuery};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("https://reader.example.com", "s3cret", Duration::from_secs(30))?;
/// let page = client.entries(&EntryQuery::default()).await?;
/// println!("{} entries on the server", page.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    /// Create a client for the server at `base_url`.
    ///
    /// The URL may include a path prefix (for servers behind a reverse
    /// proxy, e.g. `https://host/miniflux`); `v1/...` endpoints are
    /// resolved under it. `timeout` caps each whole request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse, is not `http`/`https`,
    /// or the token cannot be sent as a header value.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut base =
            Url::parse(base_url.trim()).or_raise(|| ErrorKind::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidBaseUrl(base_url.to_string()));
        }
        // Url::join replaces the last path segment unless the base ends
        // with a slash, which would silently drop reverse-proxy prefixes.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let mut token_value = HeaderValue::from_str(token.trim()).or_raise(|| ErrorKind::InvalidToken)?;
        token_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, token_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;

        Ok(Self { http, base })
    }

    /// Verify the credentials by fetching the authenticated user.
    pub async fn me(&self) -> Result<User> {
        self.get_json(self.endpoint("v1/me")?).await
    }

    /// List entries across all feeds.
    #[instrument(skip(self))]
    pub async fn entries(&self, query: &EntryQuery) -> Result<EntryPage> {
        let mut url = self.endpoint("v1/entries")?;
        query.apply(&mut url);
        self.get_json(url).await
    }

    /// List entries belonging to one feed.
    #[instrument(skip(self))]
    pub async fn feed_entries(&self, feed_id: i64, query: &EntryQuery) -> Result<EntryPage> {
        let mut url = self.endpoint(&format!("v1/feeds/{feed_id}/entries"))?;
        query.apply(&mut url);
        self.get_json(url).await
    }

    /// List entries belonging to one category.
    #[instrument(skip(self))]
    pub async fn category_entries(&self, category_id: i64, query: &EntryQuery) -> Result<EntryPage> {
        let mut url = self.endpoint(&format!("v1/categories/{category_id}/entries"))?;
        query.apply(&mut url);
        self.get_json(url).await
    }

    /// Fetch a single entry with its full content.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] when the ID does not exist on the
    /// server (or belongs to another user).
    #[instrument(skip(self))]
    pub async fn entry(&self, id: i64) -> Result<Entry> {
        self.get_json(self.endpoint(&format!("v1/entries/{id}"))?).await
    }

    /// List all subscribed feeds.
    pub async fn feeds(&self) -> Result<Vec<Feed>> {
        self.get_json(self.endpoint("v1/feeds")?).await
    }

    /// List all categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get_json(self.endpoint("v1/categories")?).await
    }

    /// Set the read-state of the given entries on the server.
    ///
    /// No-op when `ids` is empty. The server answers 204 with no body.
    #[instrument(skip(self))]
    pub async fn update_status(&self, ids: &[i64], status: EntryStatus) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        #[derive(Serialize)]
        struct Payload<'a> {
            entry_ids: &'a [i64],
            status: &'a str,
        }

        let url = self.endpoint("v1/entries")?;
        debug!(url = %url, count = ids.len(), "PUT");
        let response = self
            .http
            .put(url.clone())
            .json(&Payload { entry_ids: ids, status: status.as_str() })
            .send()
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;
        Self::check_status(response.status(), &url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).or_raise(|| ErrorKind::InvalidBaseUrl(self.base.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;
        Self::check_status(response.status(), &url)?;
        response.json::<T>().await.or_raise(|| ErrorKind::Decode)
    }

    fn check_status(status: StatusCode, url: &Url) -> Result<()> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => exn::bail!(ErrorKind::Unauthorized),
            StatusCode::NOT_FOUND => exn::bail!(ErrorKind::NotFound(url.path().to_string())),
            status if !status.is_success() => exn::bail!(ErrorKind::Status(status.as_u16())),
            _ => Ok(()),
        }
    }
}
