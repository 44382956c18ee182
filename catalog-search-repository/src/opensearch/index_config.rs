//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the product index.

use serde_json::{json, Value};

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the physical index (e.g., 0 for "products_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// The versioned physical index name behind the alias.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_search_repository::opensearch::IndexConfig;
    ///
    /// assert_eq!(IndexConfig::new("products", 3).index_name(), "products_v3");
    /// ```
    pub fn index_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

/// Longest name or description, in characters, that substring search can match.
///
/// The `.raw` keyword sub-fields skip longer values: a Lucene term holds at most
/// 32766 bytes, and 8191 characters of UTF-8 always fit. Longer values are still
/// stored and returned, but never matched by a search on OpenSearch.
pub const MAX_MATCHABLE_CHARS: u32 = 8191;

/// Get the index settings and mappings for the product index.
///
/// The configuration includes:
/// - **Keyword sub-fields** on `name` and `description` (`.raw`), used by the
///   case-insensitive wildcard match and as the name index
/// - **Keyword** `category_name`, the category index for filtering
/// - **Non-indexed** `version`, kept only for the version guard
///
/// Unknown fields are stored but not indexed (`dynamic: false`).
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic": false,
            "properties": {
                "id": {
                    "type": "long"
                },
                "name": {
                    "type": "text",
                    "fields": {
                        "raw": {
                            "type": "keyword",
                            "ignore_above": MAX_MATCHABLE_CHARS
                        }
                    }
                },
                "description": {
                    "type": "text",
                    "fields": {
                        "raw": {
                            "type": "keyword",
                            "ignore_above": MAX_MATCHABLE_CHARS
                        }
                    }
                },
                "price": {
                    "type": "double"
                },
                "category_name": {
                    "type": "keyword"
                },
                "version": {
                    "type": "long",
                    "index": false
                }
            }
        }
    })
}
