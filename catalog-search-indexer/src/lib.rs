//! # Catalog Search Indexer
//!
//! Consumes product events from Kafka and projects them into the product
//! search index.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives raw messages from Kafka in batches
//! 2. **Processor**: Decodes messages into index actions
//! 3. **Loader**: Applies version-guarded upserts and deletes, with retries
//! 4. **Dead-letter sink**: Receives messages that cannot be applied
//! 5. **Orchestrator**: Coordinates the flow and acknowledges applied batches
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`consumer`]: Kafka consumer for product events
//! - [`processor`]: Decodes messages into index actions
//! - [`loader`]: Applies actions to the search index
//! - [`dead_letter`]: Dead-letter records and sinks
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod consumer;
pub mod dead_letter;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::{Dependencies, IndexerSettings};
pub use errors::IngestError;

use catalog_kafka::KafkaSetupError;
use catalog_search_repository::SearchIndexError;
use catalog_search_shared::ConfigError;
use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    MissingConfiguration(#[from] ConfigError),

    /// The search store could not be opened.
    #[error("Search store error: {0}")]
    StoreError(#[from] SearchIndexError),

    /// Kafka clients or topics could not be set up.
    #[error("Kafka setup error: {0}")]
    KafkaSetupError(#[from] KafkaSetupError),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),

    /// Logging could not be initialized.
    #[error("Tracing error: {0}")]
    TracingError(String),
}
