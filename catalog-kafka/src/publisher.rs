//! Producer half of the product event contract.
//!
//! The catalog publishes one event after each committed product write. Events
//! are keyed by product id so every event for an id lands on the same
//! partition.

use std::time::Duration;

use catalog_search_shared::ProductEvent;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{debug, error};

use crate::config::KafkaSettings;
use crate::errors::KafkaSetupError;

/// Header carrying the event type name, for routing without decoding.
pub const EVENT_TYPE_HEADER: &str = "event-type";

/// How long a send may wait for space in the local producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a Kafka producer with the given settings.
///
/// Configures the producer with:
/// - zstd compression
/// - idempotent delivery
/// - SASL/SSL authentication if credentials are provided
pub fn create_producer(settings: &KafkaSettings) -> Result<FutureProducer, KafkaSetupError> {
    Ok(settings.producer_config().create()?)
}

/// Where a published event was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Publishes product events to the events topic.
pub struct CatalogEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl CatalogEventPublisher {
    /// Create a publisher with its own producer.
    pub fn new(
        settings: &KafkaSettings,
        topic: impl Into<String>,
    ) -> Result<Self, KafkaSetupError> {
        Ok(Self::with_producer(create_producer(settings)?, topic))
    }

    /// Create a publisher around an existing producer.
    pub fn with_producer(producer: FutureProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }

    /// The topic events are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish `event` and wait for the broker to acknowledge it.
    ///
    /// Call this only after the catalog write that produced the event has
    /// committed.
    pub async fn publish(&self, event: &ProductEvent) -> Result<Delivery, KafkaSetupError> {
        let payload = event
            .encode()
            .map_err(|e| KafkaSetupError::Serialization(e.to_string()))?;
        let key = message_key(event);
        let headers = OwnedHeaders::new().insert(Header {
            key: EVENT_TYPE_HEADER,
            value: Some(event.event_type()),
        });

        let record = FutureRecord::to(&self.topic)
            .key(&key)
            .payload(&payload)
            .headers(headers);

        match self.producer.send(record, QUEUE_TIMEOUT).await {
            Ok((partition, offset)) => {
                debug!(
                    topic = %self.topic,
                    product_id = event.product_id(),
                    version = event.version(),
                    event_type = event.event_type(),
                    partition = partition,
                    offset = offset,
                    "Published product event"
                );
                Ok(Delivery { partition, offset })
            }
            Err((e, _)) => {
                error!(
                    topic = %self.topic,
                    product_id = event.product_id(),
                    error = %e,
                    "Failed to publish product event"
                );
                Err(e.into())
            }
        }
    }
}

/// Partition key for an event: the decimal product id.
pub fn message_key(event: &ProductEvent) -> String {
    event.product_id().to_string()
}
