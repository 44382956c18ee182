//! Utility functions for the catalog search repository.

use crate::errors::SearchIndexError;
use crate::opensearch::MAX_MATCHABLE_CHARS;

/// Escape the characters that are special in an OpenSearch `wildcard` pattern.
///
/// Queries are matched as literal substrings, so `*`, `?` and `\` typed by a
/// user must not act as pattern operators.
///
/// # Example
///
/// ```
/// use catalog_search_repository::utils::escape_wildcard;
///
/// assert_eq!(escape_wildcard("50% off*"), "50% off\\*");
/// ```
pub fn escape_wildcard(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring test.
///
/// `needle` must already be lowercased. Values longer than
/// [`MAX_MATCHABLE_CHARS`] never match, as on OpenSearch.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.chars().count() <= MAX_MATCHABLE_CHARS as usize
        && haystack.to_lowercase().contains(needle)
}

/// Convert a catalog version to the signed version OpenSearch accepts.
pub fn external_version(version: u64) -> Result<i64, SearchIndexError> {
    i64::try_from(version)
        .map_err(|_| SearchIndexError::validation(format!("Version {} is out of range", version)))
}
