//! Word token extraction shared by local matching and catalog queries.

use regex::Regex;
use std::sync::LazyLock;

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.\-_+\s]+").expect("word regex is valid"));

/// Split a name fragment on runs of `.`, `-`, `_`, `+` and whitespace.
pub fn tokens(name: &str) -> Vec<&str> {
    WORD_REGEX.find_iter(name).map(|m| m.as_str()).collect()
}

/// Tokens rejoined with single spaces, e.g. for a catalog search query.
pub fn joined(name: &str) -> String {
    tokens(name).join(" ")
}

/// Lower-cased joined form used for every edit distance computation.
pub fn comparable(name: &str) -> String {
    joined(name).to_lowercase()
}

/// Levenshtein distance between the comparable forms of two names.
pub fn distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(&comparable(a), &comparable(b))
}
