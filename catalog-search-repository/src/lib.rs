//! # Catalog Search Repository
//!
//! This crate provides the storage side of the product search index: the
//! `SearchIndexProvider` trait, an OpenSearch implementation, an in-memory
//! implementation for tests and local runs, startup bootstrap, and the
//! `ProductSearchService` that answers text queries.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod service;
pub mod types;
pub mod utils;

pub use bootstrap::open_store;
pub use config::{ConfigError, ProductSearchServiceConfig, StoreKind, StoreSettings};
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use memory::InMemoryProvider;
pub use opensearch::OpenSearchProvider;
pub use service::ProductSearchService;
pub use types::{ApplyOutcome, DeleteProductRequest, SearchProductsRequest};
