//! Content analysis: derive tags and a category for a post and reconcile
//! them with the taxonomy already stored on the backend.
//!
//! Extraction and inference are pure text passes ([`keywords`], [`category`]).
//! [`ContentAnalyzer`] adds the backend round-trips: it lists existing tags
//! and categories, reuses what matches, and creates what is missing.

pub mod category;
pub mod keywords;

use std::collections::HashSet;

use halopub_client::HaloClient;
use halopub_shared::{Category, HaloPubError, Result, Tag, TaxonomyKind};
use tracing::{debug, info, instrument, warn};

pub use category::{CATEGORY_RULES, DEFAULT_CATEGORY, infer_category};
pub use keywords::{MAX_KEYWORDS, extract_keywords, strip_html};

/// Below this many reused tags, new tags are created from keywords.
pub const MIN_MATCHED_TAGS: usize = 3;

/// Matched plus newly created tags never exceed this.
pub const MAX_TAGS: usize = 5;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Taxonomy references to attach to a post.
#[derive(Debug, Default)]
pub struct GeneratedTaxonomy {
    /// Tag metadata names, reused ones first.
    pub tags: Vec<String>,
    /// Category metadata names (zero or one).
    pub categories: Vec<String>,
    /// Creations that failed and were skipped.
    pub failures: Vec<HaloPubError>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Names of existing tags that match a keyword, one per keyword.
///
/// A keyword matches a tag when either lowercased string contains the other.
/// Tags with an empty display name are skipped explicitly: an empty string is
/// contained in every keyword, so without this guard such a tag would match
/// everything.
pub fn match_existing_tags(keywords: &[String], existing: &[Tag]) -> Vec<String> {
    keywords
        .iter()
        .filter_map(|keyword| {
            let keyword = keyword.to_lowercase();
            existing
                .iter()
                .find(|tag| {
                    let display = tag.spec.display_name.to_lowercase();
                    !display.is_empty() && (display.contains(&keyword) || keyword.contains(&display))
                })
                .map(|tag| tag.name().to_string())
        })
        .collect()
}

/// Keywords that should become new tags, given how many tags were matched.
///
/// Only the first `MAX_TAGS - matched` keywords are considered, and any whose
/// lowercased form equals an existing display name is skipped.
pub fn tags_to_create<'k>(keywords: &'k [String], matched: usize, existing: &[Tag]) -> Vec<&'k str> {
    if matched >= MIN_MATCHED_TAGS {
        return Vec::new();
    }

    let known: HashSet<String> = existing
        .iter()
        .map(|tag| tag.spec.display_name.to_lowercase())
        .collect();

    keywords
        .iter()
        .take(MAX_TAGS - matched)
        .filter(|keyword| !known.contains(&keyword.to_lowercase()))
        .map(String::as_str)
        .collect()
}

/// Existing category whose display name equals `name` exactly.
fn find_category<'a>(existing: &'a [Category], name: &str) -> Option<&'a Category> {
    existing.iter().find(|c| c.spec.display_name == name)
}

// ---------------------------------------------------------------------------
// ContentAnalyzer
// ---------------------------------------------------------------------------

/// Generates taxonomy for posts against a live backend.
#[derive(Debug, Clone, Copy)]
pub struct ContentAnalyzer<'a> {
    client: &'a HaloClient,
}

impl<'a> ContentAnalyzer<'a> {
    pub fn new(client: &'a HaloClient) -> Self {
        Self { client }
    }

    /// Derive tags and a category for a post, creating missing ones.
    ///
    /// Failing to list either collection aborts with that error. Failing to
    /// create an individual tag or the category is logged, recorded in
    /// [`GeneratedTaxonomy::failures`], and skipped.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn generate_tags_and_categories(
        &self,
        title: &str,
        content: &str,
    ) -> Result<GeneratedTaxonomy> {
        let (existing_tags, existing_categories) =
            tokio::try_join!(self.client.get_tags(), self.client.get_categories())?;
        debug!(
            tags = existing_tags.items.len(),
            categories = existing_categories.items.len(),
            "fetched existing taxonomy"
        );

        let keywords = extract_keywords(&format!("{title} {content}"));
        debug!(?keywords, "extracted keywords");

        let mut result = GeneratedTaxonomy {
            tags: match_existing_tags(&keywords, &existing_tags.items),
            ..Default::default()
        };
        let matched = result.tags.len();

        // one at a time, in keyword order
        for keyword in tags_to_create(&keywords, matched, &existing_tags.items) {
            match self.client.create_tag(keyword, None).await {
                Ok(tag) => result.tags.push(tag.name().to_string()),
                Err(e) => {
                    warn!(keyword, error = %e, "failed to create tag, skipping");
                    result
                        .failures
                        .push(HaloPubError::reconciliation(TaxonomyKind::Tag, keyword, &e));
                }
            }
        }

        let inferred = infer_category(title, content);
        match find_category(&existing_categories.items, inferred) {
            Some(category) => result.categories.push(category.name().to_string()),
            None => match self.client.create_category(inferred, None, None).await {
                Ok(category) => result.categories.push(category.name().to_string()),
                Err(e) => {
                    warn!(category = inferred, error = %e, "failed to create category, skipping");
                    result.failures.push(HaloPubError::reconciliation(
                        TaxonomyKind::Category,
                        inferred,
                        &e,
                    ));
                }
            },
        }

        info!(
            matched,
            tags = result.tags.len(),
            category = inferred,
            failures = result.failures.len(),
            "taxonomy generated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halopub_shared::HaloConfig;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TAGS: &str = "/apis/content.halo.run/v1alpha1/tags";
    const CATEGORIES: &str = "/apis/content.halo.run/v1alpha1/categories";

    fn tag(name: &str, display: &str) -> Tag {
        Tag::from_spec(
            name,
            halopub_shared::TagSpec {
                display_name: display.into(),
                slug: name.into(),
                color: String::new(),
                cover: String::new(),
            },
        )
    }

    fn envelope(kind: &str, name: &str, display: &str) -> Value {
        json!({
            "apiVersion": "content.halo.run/v1alpha1",
            "kind": kind,
            "metadata": {"name": name},
            "spec": {"displayName": display, "slug": name}
        })
    }

    fn list(items: Vec<Value>) -> ResponseTemplate {
        let total = items.len();
        ResponseTemplate::new(200).set_body_json(json!({"items": items, "total": total}))
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substring_match_runs_both_ways() {
        let existing = vec![tag("tag-api", "API设计"), tag("tag-js", "js")];
        let matched = match_existing_tags(&words(&["设计", "JavaScript", "Python"]), &existing);
        // 设计 is inside "api设计"; "js" is not inside "javascript", so no match
        assert_eq!(matched, vec!["tag-api"]);

        let existing = vec![tag("tag-java", "Java")];
        let matched = match_existing_tags(&words(&["JavaScript"]), &existing);
        assert_eq!(matched, vec!["tag-java"]);
    }

    #[test]
    fn empty_display_names_never_match() {
        let existing = vec![tag("blank", ""), tag("tag-rust", "Rust")];
        let matched = match_existing_tags(&words(&["rust", "tokio"]), &existing);
        assert_eq!(matched, vec!["tag-rust"]);
    }

    #[test]
    fn creation_budget_shrinks_with_matches() {
        let keywords = words(&["Hello", "World", "JavaScript", "APIs", "post", "about"]);
        assert_eq!(
            tags_to_create(&keywords, 0, &[]),
            vec!["Hello", "World", "JavaScript", "APIs", "post"]
        );
        assert_eq!(tags_to_create(&keywords, 2, &[]), vec!["Hello", "World", "JavaScript"]);
        assert!(tags_to_create(&keywords, 3, &[]).is_empty());
    }

    #[test]
    fn creation_skips_exact_existing_names() {
        let keywords = words(&["Rust", "Tokio"]);
        let existing = vec![tag("tag-rust", "rust")];
        assert_eq!(tags_to_create(&keywords, 0, &existing), vec!["Tokio"]);
    }

    #[tokio::test]
    async fn reuses_matching_taxonomy_without_creating() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(list(vec![
                envelope("Tag", "tag-api", "API设计"),
                envelope("Tag", "tag-rust", "Rust"),
                envelope("Tag", "tag-async", "async"),
            ]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(list(vec![envelope("Category", "cat-default", "default")]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = HaloClient::new(HaloConfig::new(&server.uri(), "t").unwrap()).unwrap();
        let generated = ContentAnalyzer::new(&client)
            .generate_tags_and_categories("设计", "rust async tokio")
            .await
            .unwrap();

        assert_eq!(generated.tags, vec!["tag-api", "tag-rust", "tag-async"]);
        assert_eq!(generated.categories, vec!["cat-default"]);
        assert!(generated.failures.is_empty());
    }

    #[tokio::test]
    async fn creation_failures_are_skipped_and_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TAGS))
            .and(body_partial_json(json!({"spec": {"displayName": "Beta"}})))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TAGS))
            .respond_with(ResponseTemplate::new(201).set_body_json(envelope("Tag", "tag-new", "x")))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CATEGORIES))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = HaloClient::new(HaloConfig::new(&server.uri(), "t").unwrap()).unwrap();
        let generated = ContentAnalyzer::new(&client)
            .generate_tags_and_categories("Alpha", "Beta Gamma")
            .await
            .unwrap();

        assert_eq!(generated.tags, vec!["tag-new", "tag-new"]);
        assert!(generated.categories.is_empty());
        assert_eq!(generated.failures.len(), 2);
        assert!(generated.failures[0].to_string().contains("'Beta'"));
        assert!(generated.failures[1].to_string().contains("category 'default'"));
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TAGS))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(CATEGORIES))
            .respond_with(list(vec![]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let client = HaloClient::new(HaloConfig::new(&server.uri(), "t").unwrap()).unwrap();
        let err = ContentAnalyzer::new(&client)
            .generate_tags_and_categories("Title", "body")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
