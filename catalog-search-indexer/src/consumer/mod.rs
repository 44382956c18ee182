//! Consumer module for the search indexer ingest.
//!
//! Provides Kafka consumer functionality for receiving product events.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::{BatchConfig, KafkaConsumer};
pub use messages::{InboundMessage, SourceOffset, StreamMessage};
