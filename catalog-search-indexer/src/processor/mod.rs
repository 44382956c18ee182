//! Processor module for the search indexer ingest.
//!
//! Decodes raw messages into index actions.

mod event_processor;

pub use event_processor::{EventProcessor, IndexAction, ProcessedMessage};
