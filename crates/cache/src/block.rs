//! Message blocks and the block sequence
//!
//! A [`MessageBlock`] is a sealed batch of messages grouped by topic. Once
//! sealed it is shared behind `Arc` and never mutated. A [`BlockSequence`]
//! is the ordered list of sealed blocks for one log, plus the time the
//! first block starts at.

use logstream_core::{MessageEvent, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A sealed batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBlock {
    messages_by_topic: BTreeMap<String, Vec<MessageEvent>>,
    size_in_bytes: usize,
    need_topics: BTreeSet<String>,
}

impl MessageBlock {
    /// Seal `events` into a block, grouping by topic and keeping arrival order.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = MessageEvent>,
    {
        let mut builder = BlockBuilder::new();
        for event in events {
            builder.push(event);
        }
        builder.seal()
    }

    /// Mark topics whose messages for this block's window are still missing.
    pub fn with_need_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.need_topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Messages for one topic, empty if the block has none.
    pub fn messages(&self, topic: &str) -> &[MessageEvent] {
        self.messages_by_topic
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Topics with at least one message in this block.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.messages_by_topic.keys().map(String::as_str)
    }

    /// Whether the block holds any message for `topic`.
    pub fn contains_topic(&self, topic: &str) -> bool {
        self.messages_by_topic.contains_key(topic)
    }

    /// Total payload size of all messages.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Topics still awaited for this block.
    pub fn need_topics(&self) -> &BTreeSet<String> {
        &self.need_topics
    }

    /// Total number of messages.
    pub fn len(&self) -> usize {
        self.messages_by_topic.values().map(Vec::len).sum()
    }

    /// Whether the block holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages_by_topic.is_empty()
    }
}

/// Accumulates messages for a block that is not sealed yet.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    messages_by_topic: BTreeMap<String, Vec<MessageEvent>>,
    size_in_bytes: usize,
}

impl BlockBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to its topic's list.
    pub fn push(&mut self, event: MessageEvent) {
        self.size_in_bytes += event.size_in_bytes;
        self.messages_by_topic
            .entry(event.topic.clone())
            .or_default()
            .push(event);
    }

    /// Bytes accumulated so far.
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Finish the block.
    pub fn seal(self) -> MessageBlock {
        MessageBlock {
            messages_by_topic: self.messages_by_topic,
            size_in_bytes: self.size_in_bytes,
            need_topics: BTreeSet::new(),
        }
    }
}

/// Identity of a block sequence.
///
/// Two sequences with equal ids hold the same blocks. Appending keeps the
/// lineage and bumps the length; a wholesale replacement starts a new
/// lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId {
    /// Changes on every wholesale replacement
    pub lineage: u64,
    /// Number of sealed blocks
    pub len: usize,
}

/// Ordered sealed blocks plus the overall start time.
#[derive(Debug, Clone, Default)]
pub struct BlockSequence {
    pub(crate) lineage: u64,
    pub(crate) start_time: Timestamp,
    pub(crate) blocks: Vec<Arc<MessageBlock>>,
}

impl BlockSequence {
    /// Empty sequence of a given lineage.
    pub fn new(lineage: u64, start_time: Timestamp) -> Self {
        BlockSequence {
            lineage,
            start_time,
            blocks: Vec::new(),
        }
    }

    /// Current identity.
    pub fn id(&self) -> SequenceId {
        SequenceId {
            lineage: self.lineage,
            len: self.blocks.len(),
        }
    }

    /// Time the first block starts at.
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// Sealed blocks in arrival order.
    pub fn blocks(&self) -> &[Arc<MessageBlock>] {
        &self.blocks
    }

    /// Number of sealed blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block has been sealed yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total payload size across all blocks.
    pub fn size_in_bytes(&self) -> usize {
        self.blocks.iter().map(|b| b.size_in_bytes()).sum()
    }
}
