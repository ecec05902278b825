//! Keyword extraction from post text.
//!
//! Each pass is a plain `&str -> _` function over the raw post body.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// How many keywords [`extract_keywords`] returns at most.
pub const MAX_KEYWORDS: usize = 8;

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Runs of two or more CJK ideographs, or three or more ASCII letters.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{4E00}-\x{9FA5}]{2,}|[A-Za-z]{3,}").expect("valid regex")
});

/// Remove anything that looks like an HTML tag.
pub fn strip_html(text: &str) -> String {
    HTML_TAG_RE.replace_all(text, "").into_owned()
}

/// The most frequent tokens of `text`, most frequent first.
///
/// Tokens keep their original casing. Ties keep first-occurrence order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let plain = strip_html(text);

    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for token in TOKEN_RE.find_iter(&plain) {
        let word = token.as_str();
        match index.get(word) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    // sort_by is stable, so equal counts stay in insertion order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word.to_string())
        .collect()
}
