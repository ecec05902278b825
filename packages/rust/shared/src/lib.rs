//! Shared types, error model, and configuration for halopub.
//!
//! This crate is the foundation depended on by all other halopub crates.
//! It provides:
//! - [`HaloPubError`], the unified error type
//! - Resource envelopes ([`Tag`], [`Category`], [`Post`], [`Snapshot`])
//! - Slug derivation ([`taxonomy_slug`], [`post_slug`])
//! - Configuration ([`AppConfig`], [`HaloConfig`], config loading)

pub mod config;
pub mod error;
pub mod slug;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConfigOverrides, DEFAULT_BASE_URL, HaloConfig, HaloSection, config_dir,
    config_file_path, init_config, init_config_in, load_config, load_config_from,
};
pub use error::{HaloPubError, Result, TaxonomyKind};
pub use slug::{MAX_POST_SLUG_LEN, post_slug, taxonomy_slug};
pub use types::{
    API_VERSION, Category, CategorySpec, Excerpt, ListResult, Metadata, NewPost, Post, PostSpec,
    Resource, ResourceSpec, Snapshot, SnapshotSpec, SubjectRef, Tag, TagSpec, Visibility,
};
