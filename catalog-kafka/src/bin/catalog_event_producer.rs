//! Catalog event producer.
//!
//! Publishes a sample product lifecycle to the events topic so the indexer and
//! the search API can be exercised locally without the catalog service.

use anyhow::{Context, Result};
use catalog_kafka::{ensure_topics, CatalogEventPublisher, KafkaSettings, TopicSettings};
use catalog_search_shared::ProductEvent;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn sample_events() -> Vec<ProductEvent> {
    vec![
        ProductEvent::created(
            1,
            "Wireless Headphones",
            Some("Over-ear, noise cancelling".to_string()),
            129.99,
            Some("Electronics".to_string()),
            1,
        ),
        ProductEvent::created(
            2,
            "Kettle",
            None,
            24.50,
            Some("Kitchen".to_string()),
            1,
        ),
        ProductEvent::created(
            3,
            "USB-C Cable",
            Some("60W charge, braided.".to_string()),
            12.00,
            Some("Electronics".to_string()),
            1,
        ),
        ProductEvent::updated(
            3,
            "USB-C Cable",
            Some("60W charge, braided, on sale.".to_string()),
            9.00,
            Some("Electronics".to_string()),
            2,
        ),
        ProductEvent::deleted(2, 2),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let kafka = KafkaSettings::from_env("catalog-event-producer")?;
    let topics = TopicSettings::from_env()?;

    ensure_topics(&kafka, &topics)
        .await
        .context("Failed to provision topics")?;

    let publisher = CatalogEventPublisher::new(&kafka, &topics.events_topic)?;

    for event in sample_events() {
        let delivery = publisher
            .publish(&event)
            .await
            .with_context(|| format!("Failed to publish {}", event.event_type()))?;
        info!(
            product_id = event.product_id(),
            event_type = event.event_type(),
            partition = delivery.partition,
            offset = delivery.offset,
            "Published sample event"
        );
    }

    info!(topic = %publisher.topic(), "Sample events published");
    Ok(())
}
