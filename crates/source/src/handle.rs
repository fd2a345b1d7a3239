//! The opened logical log
//!
//! A [`LogHandle`] is built once by a successful `initialize` and never
//! changes afterwards. Iterators share its segments through `Arc`, so a
//! handle can be closed while an iterator is still draining.

use crate::segment::Segment;
use logstream_core::{Timestamp, Topic, TopicStats};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Segments plus the metadata derived from them.
#[derive(Debug)]
pub struct LogHandle {
    pub(crate) segments: Vec<Arc<Segment>>,
    pub(crate) start: Timestamp,
    pub(crate) end: Timestamp,
    pub(crate) topics: Vec<Topic>,
    pub(crate) topic_stats: BTreeMap<String, TopicStats>,
}

impl LogHandle {
    /// First receive time across all segments.
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Last receive time across all segments (inclusive).
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Topics, including those without a resolved schema.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Look up a topic by name.
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    /// Per-topic message counts.
    pub fn topic_stats(&self) -> &BTreeMap<String, TopicStats> {
        &self.topic_stats
    }

    /// Opened segments in the order they were supplied.
    pub fn segments(&self) -> &[Arc<Segment>] {
        &self.segments
    }
}
