//! Shared Kafka utilities for the catalog search pipeline.
//!
//! This crate provides the Kafka client configuration used by every process
//! that talks to the broker, idempotent topic provisioning, and the producer
//! half of the product event contract.
//!
//! ## Usage
//!
//! ```ignore
//! use catalog_kafka::{ensure_topics, CatalogEventPublisher, KafkaSettings, TopicSettings};
//!
//! let kafka = KafkaSettings::from_env("catalog")?;
//! let topics = TopicSettings::from_env()?;
//! ensure_topics(&kafka, &topics).await?;
//!
//! let publisher = CatalogEventPublisher::new(&kafka, &topics.events_topic)?;
//! publisher.publish(&ProductEvent::deleted(42, 7)).await?;
//! ```

pub mod config;
pub mod errors;
pub mod publisher;
pub mod topics;

pub use config::{KafkaSettings, TopicSettings};
pub use errors::KafkaSetupError;
pub use publisher::{create_producer, CatalogEventPublisher, Delivery, EVENT_TYPE_HEADER};
pub use topics::ensure_topics;

// Re-export commonly used rdkafka types for convenience
pub use rdkafka::message::{Header, OwnedHeaders};
pub use rdkafka::producer::FutureProducer;
