//! REST path construction and routing.

use halopub_shared::{API_VERSION, HaloConfig, ResourceSpec};

/// Collection path for a resource kind, e.g. `/apis/content.halo.run/v1alpha1/tags`.
pub fn collection_path<S: ResourceSpec>() -> String {
    format!("/apis/{API_VERSION}/{}", S::PLURAL)
}

/// Path of a single named resource.
pub fn item_path<S: ResourceSpec>(name: &str) -> String {
    format!("{}/{name}", collection_path::<S>())
}

/// Absolute URL for `endpoint`.
///
/// `/apis/...` paths hang off the base URL; anything else is relative to the
/// legacy `/api/v1alpha1` prefix.
pub fn resolve_url(config: &HaloConfig, endpoint: &str) -> String {
    if endpoint.starts_with("/apis/") {
        format!("{}{endpoint}", config.base_url())
    } else {
        format!("{}{endpoint}", config.api_url())
    }
}
