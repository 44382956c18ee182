//! # Catalog Search Shared
//!
//! This crate defines the data structures exchanged between the catalog, the
//! search indexer and the query service: the versioned product event contract,
//! the indexed product document, the read records returned by searches, and the
//! environment lookup helpers every binary uses for its settings.

pub mod config;
pub mod types;

pub use config::ConfigError;

pub use types::indexed_product::IndexedProduct;
pub use types::product_event::{
    EventDecodeError, ProductDeleted, ProductEvent, ProductId, ProductSnapshot,
};
pub use types::search_query::ProductSearchQuery;
pub use types::search_result::SearchProductRecord;
