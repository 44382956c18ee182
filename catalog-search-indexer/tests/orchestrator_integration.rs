//! Integration tests for the search indexer orchestrator.
//!
//! These tests use the real Orchestrator, processor and loader against the
//! in-memory store, with mock consumer and dead-letter sink implementations.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};

use catalog_search_indexer::consumer::{InboundMessage, SourceOffset, StreamMessage};
use catalog_search_indexer::dead_letter::{DeadLetterRecord, DeadLetterSink, FailureKind};
use catalog_search_indexer::errors::IngestError;
use catalog_search_indexer::loader::{LoaderConfig, RetryPolicy, SearchLoader};
use catalog_search_indexer::orchestrator::{Consumer, Orchestrator, OrchestratorConfig};
use catalog_search_indexer::processor::EventProcessor;
use catalog_search_repository::{
    ApplyOutcome, DeleteProductRequest, InMemoryProvider, ProductSearchService, SearchIndexError,
    SearchIndexProvider, SearchProductsRequest,
};
use catalog_search_shared::{IndexedProduct, ProductEvent, ProductId, ProductSearchQuery};

const TOPIC: &str = "catalog.products";

/// Acknowledgments seen by the mock consumer: (offsets, success).
type AckLog = Arc<Mutex<Vec<(Vec<SourceOffset>, bool)>>>;

// Mock Consumer that delivers fixed batches and waits for each acknowledgment
struct MockConsumer {
    batches: Vec<Vec<InboundMessage>>,
    end_stream: bool,
    acks: AckLog,
}

impl MockConsumer {
    fn new(batches: Vec<Vec<InboundMessage>>) -> Self {
        Self {
            batches,
            end_stream: true,
            acks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn without_end(batches: Vec<Vec<InboundMessage>>) -> Self {
        Self {
            end_stream: false,
            ..Self::new(batches)
        }
    }
}

#[async_trait::async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        Ok(())
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        for messages in self.batches.clone() {
            let offsets = messages.iter().map(|m| m.source.clone()).collect();
            sender
                .send(StreamMessage::Events { messages, offsets })
                .await
                .map_err(|e| IngestError::ChannelError(e.to_string()))?;

            match ack_receiver.recv().await {
                Some(StreamMessage::Acknowledgment { offsets, success, .. }) => {
                    self.acks.lock().unwrap().push((offsets, success));
                    if !success {
                        let _ = shutdown.recv().await;
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }

        if self.end_stream {
            let _ = sender.send(StreamMessage::End).await;
        }
        let _ = shutdown.recv().await;
        Ok(())
    }
}

// Consumer that pushes batches as fast as the channel allows, like KafkaConsumer:
// on shutdown it stops sending but keeps reading acknowledgments until the
// orchestrator closes the acknowledgment channel
struct EagerConsumer {
    batches: Vec<Vec<InboundMessage>>,
    acks: AckLog,
    finished: Arc<AtomicBool>,
}

impl EagerConsumer {
    fn new(batches: Vec<Vec<InboundMessage>>) -> Self {
        Self {
            batches,
            acks: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl Consumer for EagerConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        Ok(())
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let mut pending: VecDeque<Vec<InboundMessage>> = self.batches.clone().into();
        let mut reading = true;

        loop {
            tokio::select! {
                biased;

                ack = ack_receiver.recv() => match ack {
                    Some(StreamMessage::Acknowledgment { offsets, success, .. }) => {
                        self.acks.lock().unwrap().push((offsets, success));
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = shutdown.recv(), if reading => reading = false,
                _ = std::future::ready(()), if reading && !pending.is_empty() => {
                    let messages = pending.pop_front().unwrap_or_default();
                    let offsets = messages.iter().map(|m| m.source.clone()).collect();
                    tokio::select! {
                        sent = sender.send(StreamMessage::Events { messages, offsets }) => {
                            reading = sent.is_ok();
                        }
                        _ = shutdown.recv() => reading = false,
                    }
                }
            }
        }

        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// Store that waits `delay` before every write
struct SlowProvider {
    inner: Arc<InMemoryProvider>,
    delay: Duration,
}

#[async_trait::async_trait]
impl SearchIndexProvider for SlowProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        self.inner.ensure_index_exists().await
    }

    async fn ping(&self) -> Result<(), SearchIndexError> {
        self.inner.ping().await
    }

    async fn upsert_product(
        &self,
        product: &IndexedProduct,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        sleep(self.delay).await;
        self.inner.upsert_product(product).await
    }

    async fn delete_product(
        &self,
        request: &DeleteProductRequest,
    ) -> Result<ApplyOutcome, SearchIndexError> {
        sleep(self.delay).await;
        self.inner.delete_product(request).await
    }

    async fn get_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<IndexedProduct>, SearchIndexError> {
        self.inner.get_product(product_id).await
    }

    async fn search_products(
        &self,
        request: &SearchProductsRequest,
    ) -> Result<Vec<IndexedProduct>, SearchIndexError> {
        self.inner.search_products(request).await
    }
}

// Mock dead-letter sink that records records or fails every publish
struct MockDeadLetterSink {
    records: Mutex<Vec<DeadLetterRecord>>,
    fail: bool,
}

impl MockDeadLetterSink {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn records(&self) -> Vec<DeadLetterRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DeadLetterSink for MockDeadLetterSink {
    async fn publish(&self, record: &DeadLetterRecord) -> Result<(), IngestError> {
        if self.fail {
            return Err(IngestError::dead_letter("Mock dead-letter failure"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<InMemoryProvider>,
    dead_letters: Arc<MockDeadLetterSink>,
    acks: AckLog,
    orchestrator: Orchestrator,
}

fn harness(
    consumer: MockConsumer,
    store: Arc<InMemoryProvider>,
    dead_letters: MockDeadLetterSink,
) -> Harness {
    let acks = consumer.acks.clone();
    build(
        Arc::new(consumer),
        acks,
        store.clone(),
        store,
        dead_letters,
        OrchestratorConfig {
            shutdown_grace: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        },
    )
}

fn build(
    consumer: Arc<dyn Consumer>,
    acks: AckLog,
    store: Arc<InMemoryProvider>,
    provider: Arc<dyn SearchIndexProvider>,
    dead_letters: MockDeadLetterSink,
    config: OrchestratorConfig,
) -> Harness {
    let dead_letters = Arc::new(dead_letters);
    let loader = SearchLoader::with_config(
        provider,
        LoaderConfig {
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
            concurrency: 4,
        },
    );
    let orchestrator = Orchestrator::with_config(
        consumer,
        EventProcessor::new(),
        loader,
        dead_letters.clone(),
        config,
    );

    Harness {
        store,
        dead_letters,
        acks,
        orchestrator,
    }
}

fn message(offset: i64, event: &ProductEvent) -> InboundMessage {
    InboundMessage::new(
        SourceOffset::new(TOPIC, 0, offset),
        Some(event.product_id().to_string().into_bytes()),
        event.encode().unwrap(),
    )
}

fn raw_message(offset: i64, payload: &[u8]) -> InboundMessage {
    InboundMessage::new(SourceOffset::new(TOPIC, 0, offset), None, payload.to_vec())
}

async fn search(store: Arc<InMemoryProvider>, text: &str) -> Vec<i64> {
    ProductSearchService::new(store)
        .search(&ProductSearchQuery::text(text))
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.id)
        .collect()
}

#[tokio::test]
async fn test_created_event_is_searchable() {
    let created = ProductEvent::created(
        1,
        "Wireless Headphones",
        None,
        129.99,
        Some("Electronics".to_string()),
        1,
    );
    let h = harness(
        MockConsumer::new(vec![vec![message(0, &created)]]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .expect("orchestrator timed out")
        .unwrap();

    let records = ProductSearchService::new(h.store.clone())
        .search(&ProductSearchQuery::text("headphones"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].price, 129.99);
    assert_eq!(records[0].category_name.as_deref(), Some("Electronics"));

    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks, vec![(vec![SourceOffset::new(TOPIC, 0, 0)], true)]);
}

#[tokio::test]
async fn test_deleted_product_disappears() {
    let h = harness(
        MockConsumer::new(vec![
            vec![message(0, &ProductEvent::created(2, "Kettle", None, 24.5, None, 1))],
            vec![message(1, &ProductEvent::deleted(2, 0))],
        ]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert!(search(h.store.clone(), "kettle").await.is_empty());
    assert_eq!(h.orchestrator.stats().applied, 2);
}

#[tokio::test]
async fn test_delete_of_absent_product_succeeds() {
    let h = harness(
        MockConsumer::new(vec![vec![message(0, &ProductEvent::deleted(99, 0))]]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    assert!(h.store.is_empty());
    assert_eq!(h.orchestrator.stats().absent, 1);
    assert!(h.acks.lock().unwrap().iter().all(|(_, success)| *success));
}

#[tokio::test]
async fn test_out_of_order_delivery_keeps_newest() {
    let h = harness(
        MockConsumer::new(vec![
            vec![message(0, &ProductEvent::updated(3, "New", None, 5.0, None, 5))],
            vec![message(1, &ProductEvent::created(3, "Old", None, 1.0, None, 1))],
        ]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    let stored = h.store.get_product(3).await.unwrap().unwrap();
    assert_eq!(stored.name, "New");
    assert_eq!(stored.version, 5);
    assert_eq!(h.orchestrator.stats().stale, 1);
}

#[tokio::test]
async fn test_redelivered_batch_converges() {
    let batch = vec![
        message(0, &ProductEvent::created(1, "Kettle", None, 24.5, None, 1)),
        message(
            1,
            &ProductEvent::updated(1, "Kettle", Some("Steel".to_string()), 22.0, None, 2),
        ),
    ];
    let h = harness(
        MockConsumer::new(vec![batch.clone(), batch.clone(), batch]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    let documents = h.store.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].description.as_deref(), Some("Steel"));
    assert_eq!(documents[0].version, 2);
}

#[tokio::test]
async fn test_malformed_message_is_dead_lettered_and_acknowledged() {
    let h = harness(
        MockConsumer::new(vec![vec![
            raw_message(0, b"{\"type\":\"ProductCreated\""),
            message(
                1,
                &ProductEvent::created(
                    4,
                    "USB-C Cable",
                    Some("60W charge, braided, on sale.".to_string()),
                    9.0,
                    None,
                    1,
                ),
            ),
        ]]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    let records = h.dead_letters.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, FailureKind::Malformed);
    assert_eq!(records[0].message.source.offset, 0);

    assert_eq!(search(h.store.clone(), "SALE").await, vec![4]);

    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks.len(), 1);
    assert!(acks[0].1);
    assert_eq!(h.orchestrator.stats().dead_lettered, 1);
}

#[tokio::test]
async fn test_apply_failure_is_retried_then_dead_lettered() {
    let store = Arc::new(InMemoryProvider::new());
    store.fail_next_writes(2);
    let h = harness(
        MockConsumer::new(vec![vec![message(
            0,
            &ProductEvent::created(5, "Lamp", None, 30.0, None, 1),
        )]]),
        store,
        MockDeadLetterSink::new(),
    );

    timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap()
        .unwrap();

    let records = h.dead_letters.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, FailureKind::ApplyFailed);
    assert_eq!(records[0].attempts, 2);
    assert!(h.store.is_empty());
    assert!(h.acks.lock().unwrap()[0].1);
}

#[tokio::test]
async fn test_dead_letter_failure_stops_without_acknowledging() {
    let h = harness(
        MockConsumer::new(vec![
            vec![raw_message(0, b"garbage")],
            vec![message(1, &ProductEvent::created(6, "Never", None, 1.0, None, 1))],
        ]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::failing(),
    );

    let result = timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap();

    assert!(matches!(result, Err(IngestError::DeadLetterError(_))));
    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks, vec![(vec![SourceOffset::new(TOPIC, 0, 0)], false)]);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_shutdown_handle_stops_orchestrator() {
    let h = harness(
        MockConsumer::without_end(vec![vec![message(
            0,
            &ProductEvent::created(7, "Desk", None, 99.0, None, 1),
        )]]),
        Arc::new(InMemoryProvider::new()),
        MockDeadLetterSink::new(),
    );
    let shutdown = h.orchestrator.shutdown_handle();

    let run = h.orchestrator.run();
    let trigger = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = shutdown.send(());
    };
    let (result, ()) = timeout(Duration::from_secs(5), async { tokio::join!(run, trigger) })
        .await
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_unavailable_store_fails_before_consuming() {
    let store = Arc::new(InMemoryProvider::new());
    store.set_unavailable(true);
    let h = harness(
        MockConsumer::new(vec![vec![message(0, &ProductEvent::deleted(1, 0))]]),
        store,
        MockDeadLetterSink::new(),
    );

    let result = timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .unwrap();

    assert!(matches!(result, Err(IngestError::LoaderError(_))));
    assert!(h.acks.lock().unwrap().is_empty());
}

fn eager_harness(
    consumer: EagerConsumer,
    write_delay: Duration,
    config: OrchestratorConfig,
) -> (Harness, Arc<AtomicBool>) {
    let acks = consumer.acks.clone();
    let finished = consumer.finished.clone();
    let store = Arc::new(InMemoryProvider::new());
    let provider = Arc::new(SlowProvider {
        inner: store.clone(),
        delay: write_delay,
    });
    let h = build(
        Arc::new(consumer),
        acks,
        store,
        provider,
        MockDeadLetterSink::new(),
        config,
    );
    (h, finished)
}

fn created_batches(count: i64) -> Vec<Vec<InboundMessage>> {
    (0..count)
        .map(|offset| {
            let event = ProductEvent::created(offset + 1, "Chair", None, 15.0, None, 1);
            vec![message(offset, &event)]
        })
        .collect()
}

async fn run_with_shutdown_after(
    orchestrator: &Orchestrator,
    delay: Duration,
) -> Result<(), IngestError> {
    let shutdown = orchestrator.shutdown_handle();
    let trigger = async {
        sleep(delay).await;
        let _ = shutdown.send(());
    };
    let (result, ()) = timeout(Duration::from_secs(5), async {
        tokio::join!(orchestrator.run(), trigger)
    })
    .await
    .expect("orchestrator did not stop");
    result
}

#[tokio::test]
async fn test_shutdown_with_backlog_returns_and_commits_applied_batches() {
    let (h, finished) = eager_harness(
        EagerConsumer::new(created_batches(20)),
        Duration::from_millis(50),
        OrchestratorConfig {
            channel_buffer_size: 2,
            shutdown_grace: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        },
    );

    let result = run_with_shutdown_after(&h.orchestrator, Duration::from_millis(150)).await;

    assert!(result.is_ok());
    assert!(finished.load(Ordering::SeqCst));

    let acks = h.acks.lock().unwrap().clone();
    assert!(!acks.is_empty());
    assert!(acks.len() < 20);
    assert!(acks.iter().all(|(_, success)| *success));
    // Every applied batch was acknowledged, including the one in flight at shutdown
    assert_eq!(h.store.len(), acks.len());
}

#[tokio::test]
async fn test_pipelined_batches_are_all_applied_and_acknowledged() {
    let (h, finished) = eager_harness(
        EagerConsumer::new(created_batches(8)),
        Duration::from_millis(5),
        OrchestratorConfig {
            channel_buffer_size: 4,
            shutdown_grace: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        },
    );

    // The eager consumer never ends its stream, so stop once the backlog drains
    let result = run_with_shutdown_after(&h.orchestrator, Duration::from_millis(500)).await;

    assert!(result.is_ok());
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(h.store.len(), 8);
    let acks = h.acks.lock().unwrap().clone();
    let offsets: Vec<i64> = acks.iter().flat_map(|(o, _)| o.iter().map(|s| s.offset)).collect();
    assert_eq!(offsets, (0..8).collect::<Vec<_>>());
    assert!(acks.iter().all(|(_, success)| *success));
}

#[tokio::test]
async fn test_batch_finished_during_grace_period_is_acknowledged() {
    let (h, finished) = eager_harness(
        EagerConsumer::new(created_batches(1)),
        Duration::from_millis(300),
        OrchestratorConfig {
            shutdown_grace: Duration::from_secs(2),
            ..OrchestratorConfig::default()
        },
    );

    let result = run_with_shutdown_after(&h.orchestrator, Duration::from_millis(100)).await;

    assert!(result.is_ok());
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(h.store.len(), 1);
    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks, vec![(vec![SourceOffset::new(TOPIC, 0, 0)], true)]);
}

#[tokio::test]
async fn test_batch_exceeding_grace_period_is_left_uncommitted() {
    let (h, finished) = eager_harness(
        EagerConsumer::new(created_batches(1)),
        Duration::from_secs(3),
        OrchestratorConfig {
            shutdown_grace: Duration::from_millis(200),
            ..OrchestratorConfig::default()
        },
    );

    let started = tokio::time::Instant::now();
    let result = run_with_shutdown_after(&h.orchestrator, Duration::from_millis(100)).await;

    assert!(result.is_ok());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(finished.load(Ordering::SeqCst));
    assert!(h.store.is_empty());
    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks, vec![(vec![SourceOffset::new(TOPIC, 0, 0)], false)]);
}

#[tokio::test]
async fn test_dead_letter_failure_with_backlog_returns_error() {
    let mut batches = vec![vec![raw_message(0, b"garbage")]];
    batches.extend(created_batches(10).into_iter().skip(1));
    let consumer = EagerConsumer::new(batches);
    let acks = consumer.acks.clone();
    let finished = consumer.finished.clone();
    let store = Arc::new(InMemoryProvider::new());
    let h = build(
        Arc::new(consumer),
        acks,
        store.clone(),
        store,
        MockDeadLetterSink::failing(),
        OrchestratorConfig {
            channel_buffer_size: 1,
            shutdown_grace: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        },
    );

    let result = timeout(Duration::from_secs(5), h.orchestrator.run())
        .await
        .expect("orchestrator did not stop");

    assert!(matches!(result, Err(IngestError::DeadLetterError(_))));
    assert!(finished.load(Ordering::SeqCst));
    let acks = h.acks.lock().unwrap().clone();
    assert_eq!(acks, vec![(vec![SourceOffset::new(TOPIC, 0, 0)], false)]);
    assert!(h.store.is_empty());
}
