//! End-to-end publish workflow: request → taxonomy → draft → snapshot → published post.
//!
//! Each stage is entered only when its precondition succeeds:
//!
//! | stage             | precondition                                     |
//! |-------------------|--------------------------------------------------|
//! | `Draft`           | the request builds a valid post                  |
//! | `AwaitingTaxonomy`| tags and categories are known (listing succeeds) |
//! | `Created`         | the draft POST succeeds                          |
//! | `ContentAttached` | the snapshot POST referencing the post succeeds  |
//! | `Published`       | the PUT with snapshot pointers and `publish=true`|
//!
//! A failed precondition stops the run as [`PublishFailure`] carrying the
//! stage that could not be entered. Writes made by earlier stages stay on
//! the backend.

use std::fmt;
use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use halopub_analyzer::ContentAnalyzer;
use halopub_client::HaloClient;
use halopub_shared::{HaloPubError, NewPost, Post, Resource, Snapshot, post_slug};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// Arguments of a publish call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub title: String,
    /// Post body; stored verbatim as both raw and rendered content.
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// Tag names; generated from the content when absent or empty.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Category names; generated from the content when absent or empty.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub allow_comment: bool,
    #[serde(default)]
    pub pinned: bool,
}

fn default_true() -> bool {
    true
}

impl PublishRequest {
    /// A request with defaults for everything but title and content.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            excerpt: None,
            slug: None,
            tags: None,
            categories: None,
            allow_comment: true,
            pinned: false,
        }
    }

    /// Slug to publish under: the explicit one, else derived from the title.
    pub fn resolved_slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => post_slug(&self.title),
        }
    }
}

/// Provided taxonomy list, or `None` when it has to be generated.
fn provided(list: Option<&Vec<String>>) -> Option<&Vec<String>> {
    list.filter(|items| !items.is_empty())
}

/// Stages of a publish run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Draft,
    AwaitingTaxonomy,
    Created,
    ContentAttached,
    Published,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::AwaitingTaxonomy => "awaiting taxonomy",
            Self::Created => "created",
            Self::ContentAttached => "content attached",
            Self::Published => "published",
        };
        f.write_str(name)
    }
}

/// A publish run that stopped before reaching [`PublishStage::Published`].
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PublishFailure {
    /// The stage whose precondition failed.
    pub stage: PublishStage,
    #[source]
    pub error: HaloPubError,
}

/// A successfully published post.
#[derive(Debug)]
pub struct PublishOutcome {
    /// The post as returned by the final update.
    pub post: Post,
    /// Public URL of the post.
    pub url: String,
    /// Tag or category creations skipped during generation.
    pub taxonomy_failures: Vec<HaloPubError>,
    pub elapsed: std::time::Duration,
}

impl PublishOutcome {
    /// Human-readable report of the published post.
    pub fn summary(&self) -> String {
        let spec = &self.post.spec;
        format!(
            "Post published successfully!\n\
             Title: {}\n\
             Slug: {}\n\
             Tags: {}\n\
             Categories: {}\n\
             Post ID: {}\n\
             URL: {}",
            spec.title,
            spec.slug,
            spec.tags.join(", "),
            spec.categories.join(", "),
            self.post.name(),
            self.url,
        )
    }
}

/// Progress callback for reporting stage transitions.
pub trait ProgressReporter: Send + Sync {
    /// Called after a stage has been entered.
    fn stage(&self, stage: PublishStage);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: PublishStage) {}
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Publishes posts through a [`HaloClient`].
#[derive(Debug, Clone)]
pub struct PublishWorkflow {
    client: HaloClient,
}

impl PublishWorkflow {
    pub fn new(client: HaloClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HaloClient {
        &self.client
    }

    /// Run the full publish sequence.
    #[instrument(skip_all, fields(title = %request.title))]
    pub async fn publish(
        &self,
        request: &PublishRequest,
        progress: &dyn ProgressReporter,
    ) -> std::result::Result<PublishOutcome, PublishFailure> {
        let start = Instant::now();
        let fail = |stage: PublishStage| move |error: HaloPubError| PublishFailure { stage, error };

        // --- Draft ---
        let slug = request.resolved_slug();
        if slug.is_empty() {
            info!("title yields no slug, the backend will name the post");
        }
        let mut post = Post::draft(NewPost {
            title: request.title.clone(),
            slug,
            excerpt: request.excerpt.clone(),
            tags: request.tags.clone().unwrap_or_default(),
            categories: request.categories.clone().unwrap_or_default(),
            allow_comment: request.allow_comment,
            pinned: request.pinned,
        })
        .map_err(fail(PublishStage::Draft))?;
        progress.stage(PublishStage::Draft);

        // --- Taxonomy ---
        let mut taxonomy_failures = Vec::new();
        let tags_given = provided(request.tags.as_ref()).is_some();
        let categories_given = provided(request.categories.as_ref()).is_some();
        if !(tags_given && categories_given) {
            let generated = ContentAnalyzer::new(&self.client)
                .generate_tags_and_categories(&request.title, &request.content)
                .await
                .map_err(fail(PublishStage::AwaitingTaxonomy))?;
            if !tags_given {
                post.spec.tags = generated.tags;
            }
            if !categories_given {
                post.spec.categories = generated.categories;
            }
            taxonomy_failures = generated.failures;
        }
        progress.stage(PublishStage::AwaitingTaxonomy);

        // --- Created ---
        let mut created = self
            .client
            .create_post(&post)
            .await
            .and_then(require_name("post"))
            .map_err(fail(PublishStage::Created))?;
        progress.stage(PublishStage::Created);

        // --- ContentAttached ---
        let snapshot = Snapshot::first_revision(created.name(), &request.content, &request.content)
            .map_err(fail(PublishStage::ContentAttached))?;
        let snapshot = self
            .client
            .create_snapshot(&snapshot)
            .await
            .and_then(require_name("snapshot"))
            .map_err(fail(PublishStage::ContentAttached))?;
        progress.stage(PublishStage::ContentAttached);

        // --- Published ---
        created.mark_published(snapshot.name(), Utc::now());
        let mut published = self
            .client
            .update_post(&created)
            .await
            .map_err(fail(PublishStage::Published))?;
        if published.spec.slug.is_empty() {
            published.spec.slug = created.spec.slug.clone();
        }
        progress.stage(PublishStage::Published);

        if !taxonomy_failures.is_empty() {
            warn!(
                count = taxonomy_failures.len(),
                "published with some taxonomy creations skipped"
            );
        }

        let url = self.client.config().archive_url(&published.spec.slug);
        info!(
            name = %published.name(),
            slug = %published.spec.slug,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "post published"
        );

        Ok(PublishOutcome {
            post: published,
            url,
            taxonomy_failures,
            elapsed: start.elapsed(),
        })
    }
}

/// Reject backend answers that carry no resource name.
fn require_name<S>(
    what: &'static str,
) -> impl FnOnce(Resource<S>) -> halopub_shared::Result<Resource<S>> {
    move |resource| {
        if resource.name().is_empty() {
            Err(HaloPubError::Decode(format!("backend returned a {what} without a name")))
        } else {
            Ok(resource)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::test_support::{CATEGORIES, Echo, POSTS, SNAPSHOTS, TAGS, client_for, list};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<PublishStage>>);

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, stage: PublishStage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    fn with_taxonomy(title: &str) -> PublishRequest {
        PublishRequest {
            tags: Some(vec!["tag-a".into()]),
            categories: Some(vec!["cat-a".into()]),
            ..PublishRequest::new(title, "# Body")
        }
    }

    async fn mount_publish_path(server: &MockServer, post_name: &'static str) {
        Mock::given(method("POST"))
            .and(path(POSTS))
            .respond_with(Echo::named(post_name))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{POSTS}/{post_name}")))
            .respond_with(Echo::named(post_name))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn body_of(server: &MockServer, verb: &str, endpoint: &str) -> Value {
        let requests = server.received_requests().await.unwrap();
        let request = requests
            .iter()
            .find(|r| r.method.as_str() == verb && r.url.path() == endpoint)
            .unwrap();
        serde_json::from_slice(&request.body).unwrap()
    }

    #[test]
    fn request_defaults_and_camel_case() {
        let request: PublishRequest =
            serde_json::from_value(json!({"title": "T", "content": "C", "pinned": true})).unwrap();
        assert!(request.allow_comment);
        assert!(request.pinned);
        assert!(request.tags.is_none());

        let request: PublishRequest =
            serde_json::from_value(json!({"title": "T", "content": "C", "allowComment": false}))
                .unwrap();
        assert!(!request.allow_comment);
    }

    #[test]
    fn explicit_slug_wins_over_title() {
        let mut request = PublishRequest::new("Hello World", "");
        assert_eq!(request.resolved_slug(), "hello-world");
        request.slug = Some("custom".into());
        assert_eq!(request.resolved_slug(), "custom");
        request.slug = Some("  ".into());
        assert_eq!(request.resolved_slug(), "hello-world");
    }

    #[tokio::test]
    async fn provided_taxonomy_skips_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(list(vec![]))
            .expect(0)
            .mount(&server)
            .await;
        mount_publish_path(&server, "my-post").await;

        let progress = RecordingProgress::default();
        let mut request = with_taxonomy("My Post");
        request.excerpt = Some("Short".into());
        let outcome = PublishWorkflow::new(client_for(&server))
            .publish(&request, &progress)
            .await
            .unwrap();

        assert_eq!(outcome.post.spec.tags, vec!["tag-a"]);
        assert_eq!(outcome.post.spec.release_snapshot.as_deref(), Some("snapshot-1"));
        assert!(outcome.taxonomy_failures.is_empty());
        assert_eq!(
            *progress.0.lock().unwrap(),
            vec![
                PublishStage::Draft,
                PublishStage::AwaitingTaxonomy,
                PublishStage::Created,
                PublishStage::ContentAttached,
                PublishStage::Published,
            ]
        );

        let draft = body_of(&server, "POST", POSTS).await;
        assert_eq!(draft["spec"]["excerpt"], json!({"autoGenerate": false, "raw": "Short"}));
    }

    #[tokio::test]
    async fn cjk_title_lets_backend_name_the_post() {
        let server = MockServer::start().await;
        mount_publish_path(&server, "post-7f3a").await;

        let outcome = PublishWorkflow::new(client_for(&server))
            .publish(&with_taxonomy("你好世界"), &SilentProgress)
            .await
            .unwrap();

        let draft = body_of(&server, "POST", POSTS).await;
        assert!(draft["metadata"].get("name").is_none());
        assert_eq!(draft["metadata"]["generateName"], "post-");

        let snapshot = body_of(&server, "POST", SNAPSHOTS).await;
        assert_eq!(snapshot["spec"]["subjectRef"]["name"], "post-7f3a");

        assert_eq!(outcome.post.spec.slug, "post-7f3a");
        assert_eq!(outcome.url, format!("{}/archives/post-7f3a", server.uri()));
    }

    #[tokio::test]
    async fn missing_categories_are_generated_while_tags_are_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(list(vec![json!({
                "apiVersion": "content.halo.run/v1alpha1",
                "kind": "Category",
                "metadata": {"name": "c-tech"},
                "spec": {"displayName": "technology", "slug": "technology"}
            })]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TAGS))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .and(body_partial_json(json!({
                "spec": {"tags": ["mine"], "categories": ["c-tech"]}
            })))
            .respond_with(Echo::named("unused"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;

        let request = PublishRequest {
            tags: Some(vec!["mine".into()]),
            categories: Some(vec![]),
            ..PublishRequest::new("Python notes", "ownership and borrowing")
        };
        let outcome = PublishWorkflow::new(client_for(&server))
            .publish(&request, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(outcome.post.spec.categories, vec!["c-tech"]);
    }

    #[tokio::test]
    async fn missing_tags_are_generated_while_categories_are_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(list(vec![
                json!({"apiVersion": "content.halo.run/v1alpha1", "kind": "Tag",
                       "metadata": {"name": "t-py"}, "spec": {"displayName": "Python", "slug": "python"}}),
                json!({"apiVersion": "content.halo.run/v1alpha1", "kind": "Tag",
                       "metadata": {"name": "t-own"}, "spec": {"displayName": "ownership", "slug": "ownership"}}),
                json!({"apiVersion": "content.halo.run/v1alpha1", "kind": "Tag",
                       "metadata": {"name": "t-notes"}, "spec": {"displayName": "notes", "slug": "notes"}}),
            ]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        // generation still reconciles a category, but the explicit one is kept
        Mock::given(method("POST"))
            .and(path(CATEGORIES))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TAGS))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .and(body_partial_json(json!({
                "spec": {"tags": ["t-py", "t-notes", "t-own"], "categories": ["mine"]}
            })))
            .respond_with(Echo::named("unused"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;

        let request = PublishRequest {
            tags: None,
            categories: Some(vec!["mine".into()]),
            ..PublishRequest::new("Python notes", "ownership")
        };
        let outcome = PublishWorkflow::new(client_for(&server))
            .publish(&request, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(outcome.post.spec.tags, vec!["t-py", "t-notes", "t-own"]);
        assert_eq!(outcome.post.spec.categories, vec!["mine"]);
    }

    #[tokio::test]
    async fn draft_rejection_fails_at_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .expect(0)
            .mount(&server)
            .await;

        let failure = PublishWorkflow::new(client_for(&server))
            .publish(&with_taxonomy("Taken slug"), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PublishStage::Created);
        assert_eq!(failure.error.status(), Some(409));
    }

    #[tokio::test]
    async fn rejected_update_fails_at_published() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let progress = RecordingProgress::default();
        let failure = PublishWorkflow::new(client_for(&server))
            .publish(&with_taxonomy("Almost there"), &progress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PublishStage::Published);
        assert_eq!(progress.0.lock().unwrap().last(), Some(&PublishStage::ContentAttached));
    }

    #[tokio::test]
    async fn empty_update_answer_still_publishes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .respond_with(Echo::named("unused"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(Echo::named("snapshot-1"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("{POSTS}/hi-there")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = PublishWorkflow::new(client_for(&server))
            .publish(&with_taxonomy("Hi there"), &SilentProgress)
            .await
            .unwrap();
        assert!(outcome.post.spec.publish);
        assert_eq!(outcome.post.spec.head_snapshot.as_deref(), Some("snapshot-1"));
        assert_eq!(outcome.url, format!("{}/archives/hi-there", server.uri()));
    }

    #[tokio::test]
    async fn listing_failure_stops_before_creation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let failure = PublishWorkflow::new(client_for(&server))
            .publish(&PublishRequest::new("Hello", "World"), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PublishStage::AwaitingTaxonomy);
        assert_eq!(failure.error.status(), Some(500));
    }

    #[tokio::test]
    async fn snapshot_failure_leaves_draft_behind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(POSTS))
            .respond_with(Echo::named("unused"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SNAPSHOTS))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let failure = PublishWorkflow::new(client_for(&server))
            .publish(&with_taxonomy("Draft only"), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PublishStage::ContentAttached);
        assert_eq!(failure.to_string(), "API request failed: 422 Unprocessable Entity");
    }

    #[tokio::test]
    async fn empty_title_fails_at_draft() {
        let server = MockServer::start().await;
        let failure = PublishWorkflow::new(client_for(&server))
            .publish(&PublishRequest::new("   ", "body"), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PublishStage::Draft);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
