//! Message types for the consumer.
//!
//! Defines the structures that flow through the ingest.

use std::collections::HashMap;

/// Kafka coordinates of a consumed message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl SourceOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

/// A raw message received from Kafka, not yet decoded.
///
/// The payload is kept as delivered so a message that cannot be applied can be
/// dead-lettered byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub source: SourceOffset,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(source: SourceOffset, key: Option<Vec<u8>>, payload: Vec<u8>) -> Self {
        Self {
            source,
            key,
            payload,
        }
    }
}

/// Messages that flow through the ingest.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of messages with the offsets to acknowledge once it is applied.
    Events {
        messages: Vec<InboundMessage>,
        offsets: Vec<SourceOffset>,
    },
    /// Acknowledgment that a batch was applied (or dead-lettered).
    Acknowledgment {
        offsets: Vec<SourceOffset>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

/// Reduce acknowledged offsets to the highest offset per partition.
///
/// Committing offset `n + 1` for a partition acknowledges every message up to
/// `n`, so one entry per partition is enough.
pub fn highest_offsets(offsets: &[SourceOffset]) -> Vec<SourceOffset> {
    let mut highest: HashMap<(&str, i32), i64> = HashMap::new();
    for source in offsets {
        let entry = highest
            .entry((source.topic.as_str(), source.partition))
            .or_insert(source.offset);
        if source.offset > *entry {
            *entry = source.offset;
        }
    }

    let mut reduced: Vec<SourceOffset> = highest
        .into_iter()
        .map(|((topic, partition), offset)| SourceOffset::new(topic, partition, offset))
        .collect();
    reduced.sort_by(|a, b| (&a.topic, a.partition).cmp(&(&b.topic, b.partition)));
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_offsets_per_partition() {
        let offsets = vec![
            SourceOffset::new("catalog.products", 0, 4),
            SourceOffset::new("catalog.products", 1, 9),
            SourceOffset::new("catalog.products", 0, 7),
            SourceOffset::new("catalog.products", 0, 5),
        ];

        assert_eq!(
            highest_offsets(&offsets),
            vec![
                SourceOffset::new("catalog.products", 0, 7),
                SourceOffset::new("catalog.products", 1, 9),
            ]
        );
    }

    #[test]
    fn test_highest_offsets_empty() {
        assert!(highest_offsets(&[]).is_empty());
    }
}
