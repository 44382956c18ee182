//! Dependency initialization and wiring for the search indexer.

use std::sync::Arc;
use tracing::info;

use catalog_kafka::{create_producer, ensure_topics};
use catalog_search_repository::open_store;

use crate::config::IndexerSettings;
use crate::consumer::KafkaConsumer;
use crate::dead_letter::KafkaDeadLetterSink;
use crate::loader::SearchLoader;
use crate::orchestrator::Orchestrator;
use crate::processor::EventProcessor;
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Open the store, provision topics, and wire the ingest components.
    ///
    /// Store and broker clients are created once here and shared for the life
    /// of the process.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the store or Kafka cannot be set up
    pub async fn new(settings: &IndexerSettings) -> Result<Self, IndexingError> {
        info!(
            kafka_broker = %settings.kafka.broker,
            consumer_group = %settings.consumer_group,
            topic = %settings.topics.events_topic,
            dead_letter_topic = %settings.topics.dead_letter_topic,
            store = ?settings.store.kind,
            index_alias = %settings.store.index_alias,
            connection_mode = ?settings.store.connection_mode,
            "Initializing dependencies"
        );

        // Exits if the index and alias cannot be created
        let store = open_store(&settings.store).await?;
        info!("Search store ready");

        ensure_topics(&settings.kafka, &settings.topics).await?;

        let consumer = KafkaConsumer::new(
            &settings.kafka,
            &settings.consumer_group,
            &settings.topics.events_topic,
            settings.batch,
        )?;
        info!("Kafka consumer created");

        let dead_letters = KafkaDeadLetterSink::new(
            create_producer(&settings.kafka)?,
            &settings.topics.dead_letter_topic,
        );

        let loader = SearchLoader::with_config(store, settings.loader);

        let orchestrator = Orchestrator::with_config(
            Arc::new(consumer),
            EventProcessor::new(),
            loader,
            Arc::new(dead_letters),
            settings.orchestrator.clone(),
        );

        Ok(Self { orchestrator })
    }
}
