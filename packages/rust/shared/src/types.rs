//! Backend resource envelopes.
//!
//! Every resource the backend exposes has the same outer shape
//! (`apiVersion`, `kind`, `metadata`, `spec`); only the spec differs per kind.
//! Constructors validate required fields so a built envelope is always
//! sendable.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HaloPubError, Result};
use crate::slug::taxonomy_slug;

/// API group of all content resources.
pub const CONTENT_GROUP: &str = "content.halo.run";

/// Version of the content API group.
pub const CONTENT_VERSION: &str = "v1alpha1";

/// `apiVersion` value carried by every content envelope.
pub const API_VERSION: &str = "content.halo.run/v1alpha1";

/// Default colour assigned to new tags.
pub const DEFAULT_TAG_COLOR: &str = "#ffffff";

/// Static facts about one resource kind.
pub trait ResourceSpec: Serialize + DeserializeOwned {
    /// `kind` field of the envelope.
    const KIND: &'static str;
    /// Collection segment in the REST path.
    const PLURAL: &'static str;
    /// `metadata.generateName` hint used when the backend picks the name.
    const GENERATE_NAME: &'static str;
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Resource metadata. Fields the backend adds (labels, annotations,
/// timestamps, finalizers, ...) are kept in `extra` and sent back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Optimistic-lock version, required by the backend on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `apiVersion/kind/metadata/spec` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<S> {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: S,
}

impl<S: ResourceSpec> Resource<S> {
    /// Wrap a spec in a fresh envelope. An empty `name` leaves naming to the
    /// backend via `generateName`.
    pub fn from_spec(name: impl Into<String>, spec: S) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: S::KIND.to_string(),
            metadata: Metadata {
                name: name.into(),
                generate_name: Some(S::GENERATE_NAME.to_string()),
                ..Default::default()
            },
            spec,
        }
    }
}

impl<S> Resource<S> {
    /// Backend identity of this resource.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// A collection GET response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResult<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpec {
    pub display_name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub color: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cover: String,
}

impl ResourceSpec for TagSpec {
    const KIND: &'static str = "Tag";
    const PLURAL: &'static str = "tags";
    const GENERATE_NAME: &'static str = "tag-";
}

pub type Tag = Resource<TagSpec>;

impl Tag {
    /// A new tag; `slug` (and the resource name) default to the derived slug.
    pub fn new(display_name: &str, slug: Option<&str>) -> Result<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(HaloPubError::validation("tag display name must not be empty"));
        }
        let slug = slug
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| taxonomy_slug(display_name));

        Ok(Self::from_spec(
            slug.clone(),
            TagSpec {
                display_name: display_name.to_string(),
                slug,
                color: DEFAULT_TAG_COLOR.to_string(),
                cover: String::new(),
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpec {
    pub display_name: String,
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cover: String,
    #[serde(default, deserialize_with = "nullable")]
    pub template: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, deserialize_with = "nullable")]
    pub children: Vec<String>,
}

impl ResourceSpec for CategorySpec {
    const KIND: &'static str = "Category";
    const PLURAL: &'static str = "categories";
    const GENERATE_NAME: &'static str = "category-";
}

pub type Category = Resource<CategorySpec>;

impl Category {
    /// A new top-level category with no children.
    pub fn new(display_name: &str, slug: Option<&str>, description: Option<&str>) -> Result<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(HaloPubError::validation(
                "category display name must not be empty",
            ));
        }
        let slug = slug
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| taxonomy_slug(display_name));

        Ok(Self::from_spec(
            slug.clone(),
            CategorySpec {
                display_name: display_name.to_string(),
                slug,
                description: description.unwrap_or_default().to_string(),
                cover: String::new(),
                template: String::new(),
                priority: 0,
                children: Vec::new(),
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// Who can see a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Excerpt {
    #[serde(default)]
    pub auto_generate: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSpec {
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub template: String,
    #[serde(default, deserialize_with = "nullable")]
    pub cover: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub publish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default = "default_true")]
    pub allow_comment: bool,
    #[serde(default)]
    pub visible: Visibility,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub excerpt: Excerpt,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_snapshot: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceSpec for PostSpec {
    const KIND: &'static str = "Post";
    const PLURAL: &'static str = "posts";
    const GENERATE_NAME: &'static str = "post-";
}

pub type Post = Resource<PostSpec>;

/// Caller-facing fields of a post about to be created.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    /// May be empty; the backend then names the post itself.
    pub slug: String,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub allow_comment: bool,
    pub pinned: bool,
}

impl Post {
    /// A public, unpublished draft.
    pub fn draft(new: NewPost) -> Result<Self> {
        if new.title.trim().is_empty() {
            return Err(HaloPubError::validation("post title must not be empty"));
        }

        let excerpt = match new.excerpt.filter(|e| !e.is_empty()) {
            Some(raw) => Excerpt {
                auto_generate: false,
                raw,
            },
            None => Excerpt {
                auto_generate: true,
                raw: String::new(),
            },
        };

        Ok(Self::from_spec(
            new.slug.clone(),
            PostSpec {
                title: new.title,
                slug: new.slug,
                template: String::new(),
                cover: String::new(),
                deleted: false,
                publish: false,
                publish_time: None,
                pinned: new.pinned,
                allow_comment: new.allow_comment,
                visible: Visibility::Public,
                priority: 0,
                excerpt,
                tags: new.tags,
                categories: new.categories,
                head_snapshot: None,
                base_snapshot: None,
                release_snapshot: None,
                owner: String::new(),
                extra: Map::new(),
            },
        ))
    }

    /// Point the post at its first content revision and flip it to published.
    ///
    /// A post created without a slug takes the backend-assigned name as slug.
    pub fn mark_published(&mut self, snapshot_name: &str, at: DateTime<Utc>) {
        self.spec.head_snapshot = Some(snapshot_name.to_string());
        self.spec.base_snapshot = Some(snapshot_name.to_string());
        self.spec.release_snapshot = Some(snapshot_name.to_string());
        self.spec.publish = true;
        self.spec.publish_time = Some(at);
        if self.spec.slug.is_empty() {
            self.spec.slug = self.metadata.name.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Reference from a snapshot to the resource it versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    #[serde(default, deserialize_with = "nullable")]
    pub group: String,
    #[serde(default, deserialize_with = "nullable")]
    pub version: String,
    pub kind: String,
    pub name: String,
}

/// Raw source formats a snapshot can carry.
pub const RAW_TYPE_MARKDOWN: &str = "markdown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSpec {
    pub subject_ref: SubjectRef,
    pub raw_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub raw_patch: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content_patch: String,
    /// Empty for the first revision of a post.
    #[serde(default, deserialize_with = "nullable")]
    pub parent_snapshot_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceSpec for SnapshotSpec {
    const KIND: &'static str = "Snapshot";
    const PLURAL: &'static str = "snapshots";
    const GENERATE_NAME: &'static str = "snapshot-";
}

pub type Snapshot = Resource<SnapshotSpec>;

impl Snapshot {
    /// First content revision of the post named `post_name`.
    pub fn first_revision(post_name: &str, raw: &str, rendered: &str) -> Result<Self> {
        if post_name.is_empty() {
            return Err(HaloPubError::validation(
                "snapshot subject must reference a named post",
            ));
        }

        Ok(Self::from_spec(
            String::new(),
            SnapshotSpec {
                subject_ref: SubjectRef {
                    group: CONTENT_GROUP.to_string(),
                    version: CONTENT_VERSION.to_string(),
                    kind: PostSpec::KIND.to_string(),
                    name: post_name.to_string(),
                },
                raw_type: RAW_TYPE_MARKDOWN.to_string(),
                raw_patch: raw.to_string(),
                content_patch: rendered.to_string(),
                parent_snapshot_name: String::new(),
                owner: String::new(),
                extra: Map::new(),
            },
        ))
    }
}
