//! Time-ordered message iteration across segments
//!
//! Every segment that declares one of the requested topics gets a cursor.
//! A cursor pages through its segment with keyset queries on
//! `(timestamp, id)` and buffers at most one page. The iterator merges the
//! cursor heads with a min-heap, so events come out in non-decreasing
//! receive time globally; ties are broken by segment order, then row id.
//!
//! No I/O happens until the first pull. Dropping the iterator, or calling
//! [`MessageIterator::close`], releases every buffered page and segment
//! reference.

use crate::segment::{MessageRow, Segment};
use logstream_core::{MessageEvent, Problem, Timestamp};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

/// One item produced by a [`MessageIterator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IteratorItem {
    /// A message in the requested window
    MessageEvent(MessageEvent),
    /// A segment failed mid-iteration; its remaining messages are skipped
    Problem(Problem),
}

impl IteratorItem {
    /// The message, if this item is one.
    pub fn into_message(self) -> Option<MessageEvent> {
        match self {
            IteratorItem::MessageEvent(event) => Some(event),
            IteratorItem::Problem(_) => None,
        }
    }
}

/// Heap key: (timestamp, cursor index, row id).
type HeadKey = (i64, usize, i64);

struct SegmentCursor {
    segment: Arc<Segment>,
    topic_ids: Vec<i64>,
    /// topic id -> (topic name, schema name)
    names: HashMap<i64, (String, String)>,
    after: (i64, i64),
    end_exclusive: i64,
    page_size: usize,
    buffer: VecDeque<MessageRow>,
    exhausted: bool,
}

impl SegmentCursor {
    /// Key of the next buffered row, fetching a page if the buffer is empty.
    fn head(&mut self, index: usize) -> Result<Option<HeadKey>, Problem> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = self
                .segment
                .read_page(&self.topic_ids, self.after, self.end_exclusive, self.page_size)
                .map_err(|e| {
                    self.exhausted = true;
                    tracing::warn!(
                        segment = %self.segment.path().display(),
                        error = %e,
                        "Segment read failed, skipping rest of segment"
                    );
                    Problem::error(format!(
                        "Failed to read messages from {}: {}",
                        self.segment.path().display(),
                        e
                    ))
                })?;
            tracing::debug!(
                segment = %self.segment.path().display(),
                rows = page.len(),
                "Fetched page"
            );
            if page.len() < self.page_size {
                self.exhausted = true;
            }
            if let Some(last) = page.last() {
                self.after = (last.timestamp, last.id);
            }
            self.buffer.extend(page);
        }
        Ok(self.buffer.front().map(|row| (row.timestamp, index, row.id)))
    }

    fn to_event(&self, row: MessageRow) -> Option<MessageEvent> {
        let (topic, schema_name) = self.names.get(&row.topic_id)?;
        Some(MessageEvent::new(
            topic.clone(),
            Timestamp::from_segment_nanos(row.timestamp),
            row.data,
            schema_name.clone(),
        ))
    }
}

/// Finite, non-restartable, time-ordered sequence of message events.
pub struct MessageIterator {
    cursors: Vec<SegmentCursor>,
    heap: BinaryHeap<Reverse<HeadKey>>,
    problems: VecDeque<Problem>,
    primed: bool,
    closed: bool,
}

impl MessageIterator {
    /// Build an iterator over `topics` in `[start, end]`.
    pub(crate) fn new(
        segments: &[Arc<Segment>],
        topics: &[String],
        start: Timestamp,
        end: Timestamp,
        page_size: usize,
    ) -> Self {
        // Segment queries treat the end as exclusive; extend by one tick so
        // messages exactly at `end` are included.
        let end_exclusive = end.saturating_add(Timestamp::TICK).as_segment_nanos();
        // Pre-epoch rows report as `Timestamp::ZERO`, so an open start must
        // reach below zero to yield them.
        let start_nanos = if start == Timestamp::ZERO {
            i64::MIN
        } else {
            start.as_segment_nanos()
        };

        let cursors = segments
            .iter()
            .filter_map(|segment| {
                let names: HashMap<i64, (String, String)> = segment
                    .topics()
                    .iter()
                    .filter(|t| topics.contains(&t.name))
                    .map(|t| (t.id, (t.name.clone(), t.type_name.clone())))
                    .collect();
                if names.is_empty() {
                    return None;
                }
                let mut topic_ids: Vec<i64> = names.keys().copied().collect();
                topic_ids.sort_unstable();
                Some(SegmentCursor {
                    segment: Arc::clone(segment),
                    topic_ids,
                    names,
                    after: (start_nanos, i64::MIN),
                    end_exclusive,
                    page_size,
                    buffer: VecDeque::new(),
                    exhausted: false,
                })
            })
            .collect();

        MessageIterator {
            cursors,
            heap: BinaryHeap::new(),
            problems: VecDeque::new(),
            primed: false,
            closed: false,
        }
    }

    /// An iterator that yields nothing and touches no segment.
    pub(crate) fn empty() -> Self {
        MessageIterator {
            cursors: Vec::new(),
            heap: BinaryHeap::new(),
            problems: VecDeque::new(),
            primed: true,
            closed: true,
        }
    }

    /// Stop iterating and release all buffered rows and segment references.
    ///
    /// Subsequent calls to `next` return `None`.
    pub fn close(&mut self) {
        self.closed = true;
        self.cursors.clear();
        self.heap.clear();
        self.problems.clear();
    }

    /// Whether the iterator has been closed or exhausted.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn refill(&mut self, index: usize) {
        match self.cursors[index].head(index) {
            Ok(Some(key)) => self.heap.push(Reverse(key)),
            Ok(None) => {}
            Err(problem) => self.problems.push_back(problem),
        }
    }
}

impl Iterator for MessageIterator {
    type Item = IteratorItem;

    fn next(&mut self) -> Option<IteratorItem> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(problem) = self.problems.pop_front() {
                return Some(IteratorItem::Problem(problem));
            }
            if !self.primed {
                self.primed = true;
                for index in 0..self.cursors.len() {
                    self.refill(index);
                }
                continue;
            }

            let Some(Reverse((_, index, _))) = self.heap.pop() else {
                self.close();
                return None;
            };
            let row = self.cursors[index].buffer.pop_front();
            self.refill(index);
            if let Some(event) = row.and_then(|row| self.cursors[index].to_event(row)) {
                return Some(IteratorItem::MessageEvent(event));
            }
        }
    }
}

impl std::fmt::Debug for MessageIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageIterator")
            .field("cursors", &self.cursors.len())
            .field("primed", &self.primed)
            .field("closed", &self.closed)
            .finish()
    }
}
