//! HTTP client for the Halo content API.
//!
//! Every call carries the configured bearer token, and every non-2xx answer
//! becomes [`HaloPubError::RemoteApi`]. There are no retries: a failed call
//! surfaces immediately, and writes that already succeeded are not rolled back.

mod endpoints;

use halopub_shared::{
    Category, CategorySpec, HaloConfig, HaloPubError, ListResult, Post, PostSpec, Result, Snapshot,
    SnapshotSpec, Tag, TagSpec,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument};

pub use endpoints::{collection_path, item_path, resolve_url};

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("halopub/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// HaloClient
// ---------------------------------------------------------------------------

/// Typed access to the tag, category, post and snapshot collections.
#[derive(Debug, Clone)]
pub struct HaloClient {
    config: HaloConfig,
    http: Client,
}

impl HaloClient {
    /// Build a client whose requests all carry the config's headers.
    pub fn new(config: HaloConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers(&config)?)
            .build()
            .map_err(|e| HaloPubError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    /// Connection settings this client was built with.
    pub fn config(&self) -> &HaloConfig {
        &self.config
    }

    /// Issue `method` against `endpoint` with an optional JSON payload and
    /// return the parsed body (`null` for an empty body).
    #[instrument(skip_all, fields(method = %method, endpoint = %endpoint))]
    pub async fn request(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        let url = resolve_url(&self.config, endpoint);
        debug!(%url, has_body = body.is_some(), "sending request");

        let mut builder = self.http.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HaloPubError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HaloPubError::RemoteApi {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| HaloPubError::Network(format!("{url}: failed to read body: {e}")))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| HaloPubError::Decode(format!("{url}: {e}")))
    }

    /// Send an optional typed payload and decode a typed answer.
    async fn call<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let payload = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| HaloPubError::validation(format!("unserializable payload for {endpoint}: {e}")))?;

        let value = self.request(method, endpoint, payload.as_ref()).await?;
        serde_json::from_value(value).map_err(|e| HaloPubError::Decode(format!("{endpoint}: {e}")))
    }

    // -----------------------------------------------------------------------
    // Taxonomy
    // -----------------------------------------------------------------------

    /// List every tag.
    pub async fn get_tags(&self) -> Result<ListResult<Tag>> {
        self.call::<(), _>(Method::GET, &collection_path::<TagSpec>(), None)
            .await
    }

    /// List every category.
    pub async fn get_categories(&self) -> Result<ListResult<Category>> {
        self.call::<(), _>(Method::GET, &collection_path::<CategorySpec>(), None)
            .await
    }

    /// Create a tag; the slug defaults to the one derived from `name`.
    #[instrument(skip(self))]
    pub async fn create_tag(&self, name: &str, slug: Option<&str>) -> Result<Tag> {
        let tag = Tag::new(name, slug)?;
        let created: Tag = self
            .call(Method::POST, &collection_path::<TagSpec>(), Some(&tag))
            .await?;
        info!(name = %created.name(), "tag created");
        Ok(created)
    }

    /// Create a category; the slug defaults to the one derived from `name`.
    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: &str,
        slug: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category> {
        let category = Category::new(name, slug, description)?;
        let created: Category = self
            .call(Method::POST, &collection_path::<CategorySpec>(), Some(&category))
            .await?;
        info!(name = %created.name(), "category created");
        Ok(created)
    }

    // -----------------------------------------------------------------------
    // Posts and snapshots
    // -----------------------------------------------------------------------

    /// Submit a draft post; returns the post as stored, with its final name.
    #[instrument(skip_all, fields(slug = %post.spec.slug))]
    pub async fn create_post(&self, post: &Post) -> Result<Post> {
        let created: Post = self
            .call(Method::POST, &collection_path::<PostSpec>(), Some(post))
            .await?;
        info!(name = %created.name(), "draft post created");
        Ok(created)
    }

    /// Store a content revision.
    #[instrument(skip_all, fields(subject = %snapshot.spec.subject_ref.name))]
    pub async fn create_snapshot(&self, snapshot: &Snapshot) -> Result<Snapshot> {
        let created: Snapshot = self
            .call(Method::POST, &collection_path::<SnapshotSpec>(), Some(snapshot))
            .await?;
        info!(name = %created.name(), "snapshot created");
        Ok(created)
    }

    /// Replace a post with `post`, addressed by its metadata name.
    ///
    /// An empty success answer means the backend accepted `post` as sent.
    #[instrument(skip_all, fields(name = %post.name()))]
    pub async fn update_post(&self, post: &Post) -> Result<Post> {
        if post.name().is_empty() {
            return Err(HaloPubError::validation("cannot update a post without a name"));
        }
        let endpoint = item_path::<PostSpec>(post.name());
        let payload = serde_json::to_value(post)
            .map_err(|e| HaloPubError::validation(format!("unserializable payload for {endpoint}: {e}")))?;

        let value = self.request(Method::PUT, &endpoint, Some(&payload)).await?;
        if value.is_null() {
            debug!("empty update answer, keeping the sent post");
            return Ok(post.clone());
        }
        serde_json::from_value(value).map_err(|e| HaloPubError::Decode(format!("{endpoint}: {e}")))
    }
}

/// Translate the config's header list into reqwest default headers.
fn default_headers(config: &HaloConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in config.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HaloPubError::config(format!("invalid header name {name}: {e}")))?;
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| HaloPubError::config(format!("invalid {name} header value: {e}")))?;
        if name == reqwest::header::AUTHORIZATION {
            value.set_sensitive(true);
        }
        headers.insert(name, value);
    }
    Ok(headers)
}
