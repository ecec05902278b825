//! Slug derivation for taxonomy entries and posts.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a post slug derived from its title.
pub const MAX_POST_SLUG_LEN: usize = 50;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Everything except ASCII word characters, whitespace and hyphens.
static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("non-slug regex"));

/// Slug for a tag or category: lower-case, whitespace runs become `-`.
///
/// Non-ASCII letters are kept, so `"API 设计"` becomes `"api-设计"`.
pub fn taxonomy_slug(display_name: &str) -> String {
    WHITESPACE_RE
        .replace_all(&display_name.to_lowercase(), "-")
        .into_owned()
}

/// Slug for a post derived from its title.
///
/// Lower-cases, drops every character outside `[a-z0-9_]`, whitespace and `-`,
/// turns whitespace runs into `-` and truncates to [`MAX_POST_SLUG_LEN`].
/// The result may be empty when the title has no ASCII word characters.
pub fn post_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_SLUG_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(&stripped, "-");
    // Only ASCII remains, so byte and char boundaries coincide.
    hyphenated.chars().take(MAX_POST_SLUG_LEN).collect()
}
