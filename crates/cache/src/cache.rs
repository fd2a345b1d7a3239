//! The block cache
//!
//! Holds the current [`BlockSequence`] behind `RwLock<Arc<_>>`. Writers
//! build the next sequence and swap the `Arc`; readers clone the `Arc` and
//! work on a snapshot that never changes underneath them.

use crate::block::{BlockSequence, MessageBlock, SequenceId};
use crate::flatten::{FlattenCache, FlattenedView};
use logstream_core::Timestamp;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Append-only cache of sealed message blocks.
#[derive(Debug)]
pub struct BlockCache {
    sequence: RwLock<Arc<BlockSequence>>,
    next_lineage: AtomicU64,
    views: FlattenCache,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}

impl BlockCache {
    /// Empty cache whose first block starts at `start_time`.
    pub fn new(start_time: Timestamp) -> Self {
        BlockCache {
            sequence: RwLock::new(Arc::new(BlockSequence::new(0, start_time))),
            next_lineage: AtomicU64::new(1),
            views: FlattenCache::new(),
        }
    }

    /// Append a sealed block. Earlier blocks are untouched.
    pub fn ingest(&self, block: MessageBlock) -> SequenceId {
        let block = Arc::new(block);
        let mut guard = self.sequence.write();
        let mut next = BlockSequence::clone(&guard);
        next.blocks.push(block);
        let id = next.id();
        *guard = Arc::new(next);
        id
    }

    /// Replace the whole sequence, starting a new lineage.
    pub fn replace(&self, blocks: Vec<MessageBlock>, start_time: Timestamp) -> SequenceId {
        let lineage = self.next_lineage.fetch_add(1, Ordering::Relaxed);
        let mut next = BlockSequence::new(lineage, start_time);
        next.blocks = blocks.into_iter().map(Arc::new).collect();
        let id = next.id();
        *self.sequence.write() = Arc::new(next);
        self.views.clear();
        tracing::debug!(lineage, blocks = id.len, "Replaced block sequence");
        id
    }

    /// Consistent snapshot of the current sequence.
    pub fn snapshot(&self) -> Arc<BlockSequence> {
        Arc::clone(&self.sequence.read())
    }

    /// Identity of the current sequence.
    pub fn id(&self) -> SequenceId {
        self.sequence.read().id()
    }

    /// Memoized per-topic view of the current sequence.
    pub fn flatten(&self, topics: &BTreeSet<String>) -> Arc<FlattenedView> {
        let snapshot = self.snapshot();
        self.views.flatten(&snapshot, topics)
    }
}
