//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the document store.

mod connection;
mod index_config;
mod provider;

pub use connection::{connect_with_retry, ConnectionMode};
pub use index_config::{get_index_settings, IndexConfig, MAX_MATCHABLE_CHARS};
pub use provider::OpenSearchProvider;
