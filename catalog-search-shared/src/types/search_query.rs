//! Search query types.
//!
//! This module defines the query structure accepted by the product search.

use serde::{Deserialize, Serialize};

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 100;

/// Product search parameters.
///
/// The text is matched case-insensitively as a substring of the product name
/// or description. An absent or blank text matches nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSearchQuery {
    /// The free-text query, as received.
    #[serde(default, rename = "q")]
    pub query: Option<String>,

    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl ProductSearchQuery {
    /// Create a query for the given text.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_search_shared::ProductSearchQuery;
    ///
    /// let query = ProductSearchQuery::text("headphones");
    /// assert_eq!(query.normalized_text(), Some("headphones"));
    /// ```
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Create a query from an optional text parameter.
    pub fn new(query: Option<String>) -> Self {
        Self {
            query,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Set the maximum number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The trimmed query text, or `None` when there is nothing to match.
    pub fn normalized_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

impl Default for ProductSearchQuery {
    fn default() -> Self {
        Self::new(None)
    }
}
