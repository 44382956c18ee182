//! Product event processor implementation.
//!
//! Decodes inbound messages into the index action each event requires.

use catalog_search_repository::DeleteProductRequest;
use catalog_search_shared::{IndexedProduct, ProductEvent, ProductId};
use tracing::{debug, instrument, warn};

use crate::consumer::InboundMessage;

/// What a decoded message asks of the index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexAction {
    /// Replace the document with this snapshot (`Created` or `Updated`).
    Upsert(IndexedProduct),
    /// Remove the document (`Deleted`).
    Delete(DeleteProductRequest),
    /// The payload could not be decoded; the reason is kept for the dead-letter record.
    Malformed(String),
}

/// A message paired with the action decoded from it.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub message: InboundMessage,
    pub action: IndexAction,
}

impl ProcessedMessage {
    /// The product the action applies to. `None` for malformed messages.
    pub fn product_id(&self) -> Option<ProductId> {
        match &self.action {
            IndexAction::Upsert(doc) => Some(doc.id),
            IndexAction::Delete(request) => Some(request.product_id),
            IndexAction::Malformed(_) => None,
        }
    }

    /// The event version carried by the action.
    pub fn version(&self) -> u64 {
        match &self.action {
            IndexAction::Upsert(doc) => doc.version,
            IndexAction::Delete(request) => request.version,
            IndexAction::Malformed(_) => 0,
        }
    }
}

/// Processor that turns raw messages into index actions.
///
/// Decoding is the only step that can reject a message outright; a rejected
/// message is carried forward as [`IndexAction::Malformed`] so it is
/// dead-lettered and acknowledged with the rest of its batch.
#[derive(Debug, Default)]
pub struct EventProcessor;

impl EventProcessor {
    /// Create a new event processor.
    pub fn new() -> Self {
        Self
    }

    /// Process a batch of messages, preserving delivery order.
    #[instrument(skip(self, messages), fields(message_count = messages.len()))]
    pub fn process_batch(&self, messages: Vec<InboundMessage>) -> Vec<ProcessedMessage> {
        let processed: Vec<ProcessedMessage> = messages
            .into_iter()
            .map(|message| self.process_message(message))
            .collect();

        debug!(processed_count = processed.len(), "Processed message batch");
        processed
    }

    /// Decode a single message.
    pub fn process_message(&self, message: InboundMessage) -> ProcessedMessage {
        let action = match ProductEvent::decode(&message.payload) {
            Ok(event) => Self::action_for(event),
            Err(e) => {
                warn!(
                    topic = %message.source.topic,
                    partition = message.source.partition,
                    offset = message.source.offset,
                    error = %e,
                    "Malformed product event"
                );
                IndexAction::Malformed(e.to_string())
            }
        };

        ProcessedMessage { message, action }
    }

    fn action_for(event: ProductEvent) -> IndexAction {
        match event {
            ProductEvent::Created(snapshot) | ProductEvent::Updated(snapshot) => {
                IndexAction::Upsert(IndexedProduct::from(snapshot))
            }
            ProductEvent::Deleted(deleted) => IndexAction::Delete(DeleteProductRequest {
                product_id: deleted.product_id,
                version: deleted.version,
            }),
        }
    }
}
