//! Flattened per-topic views
//!
//! [`flatten_blocks`] concatenates every block's messages for each requested
//! topic, in block order. [`FlattenCache`] memoizes the result per topic
//! set: while the sequence identity is unchanged the same `Arc` is returned,
//! and when the sequence grows within its lineage only the new blocks are
//! scanned. Per-topic lists untouched by the new blocks are shared with the
//! previous view. Only the most recently used topic sets of the current
//! lineage are kept.

use crate::block::{BlockSequence, MessageBlock, SequenceId};
use logstream_core::MessageEvent;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Read-only per-topic ordered messages for a topic set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedView {
    source: Option<SequenceId>,
    by_topic: BTreeMap<String, Arc<Vec<MessageEvent>>>,
}

impl FlattenedView {
    /// Messages for `topic`; `None` when no block has any.
    pub fn get(&self, topic: &str) -> Option<&[MessageEvent]> {
        self.by_topic.get(topic).map(|v| v.as_slice())
    }

    /// Topics present in the view.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.by_topic.keys().map(String::as_str)
    }

    /// `(topic, messages)` pairs in topic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MessageEvent])> {
        self.by_topic
            .iter()
            .map(|(topic, messages)| (topic.as_str(), messages.as_slice()))
    }

    /// Number of topics present.
    pub fn len(&self) -> usize {
        self.by_topic.len()
    }

    /// Whether no requested topic has messages.
    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }

    /// Identity of the sequence this view was computed from.
    pub fn source(&self) -> Option<SequenceId> {
        self.source
    }

    /// Owned copy of the view keyed by topic.
    pub fn to_map(&self) -> BTreeMap<String, Vec<MessageEvent>> {
        self.by_topic
            .iter()
            .map(|(topic, messages)| (topic.clone(), messages.as_ref().clone()))
            .collect()
    }

    fn append_blocks(&mut self, blocks: &[Arc<MessageBlock>], topics: &BTreeSet<String>) {
        for topic in topics {
            let mut added = blocks
                .iter()
                .flat_map(|block| block.messages(topic))
                .peekable();
            if added.peek().is_none() {
                continue;
            }
            let entry = self.by_topic.entry(topic.clone()).or_default();
            Arc::make_mut(entry).extend(added.cloned());
        }
    }
}

/// Flatten `sequence` for `topics` without memoization.
pub fn flatten_blocks(sequence: &BlockSequence, topics: &BTreeSet<String>) -> FlattenedView {
    let mut view = FlattenedView {
        source: Some(sequence.id()),
        by_topic: BTreeMap::new(),
    };
    view.append_blocks(sequence.blocks(), topics);
    view
}

/// Topic sets a [`FlattenCache`] keeps by default.
pub const DEFAULT_FLATTEN_CAPACITY: usize = 8;

#[derive(Debug)]
struct MemoEntry {
    view: Arc<FlattenedView>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Memo {
    entries: HashMap<BTreeSet<String>, MemoEntry>,
    clock: u64,
}

impl Memo {
    fn touch(&mut self, topics: &BTreeSet<String>) -> Option<Arc<FlattenedView>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(topics).map(|entry| {
            entry.last_used = clock;
            Arc::clone(&entry.view)
        })
    }

    /// Store `view`, dropping other lineages and then the least recently
    /// used sets beyond `capacity`.
    fn insert(&mut self, topics: &BTreeSet<String>, view: Arc<FlattenedView>, capacity: usize) {
        let lineage = view.source.map(|id| id.lineage);
        self.entries
            .retain(|_, entry| entry.view.source.map(|id| id.lineage) == lineage);

        self.clock += 1;
        self.entries.insert(
            topics.clone(),
            MemoEntry {
                view,
                last_used: self.clock,
            },
        );

        while self.entries.len() > capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Memoized flattening for the most recently used topic sets.
///
/// Views are computed outside the lock; it is held only to look up and
/// store entries.
#[derive(Debug)]
pub struct FlattenCache {
    capacity: usize,
    memo: Mutex<Memo>,
}

impl Default for FlattenCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FLATTEN_CAPACITY)
    }
}

impl FlattenCache {
    /// Empty cache holding [`DEFAULT_FLATTEN_CAPACITY`] topic sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache holding at most `capacity` topic sets (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        FlattenCache {
            capacity: capacity.max(1),
            memo: Mutex::new(Memo::default()),
        }
    }

    /// Maximum number of memoized topic sets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// View of `sequence` restricted to `topics`.
    ///
    /// Returns the previously computed `Arc` when `sequence` has the same
    /// identity as last time for this topic set.
    pub fn flatten(&self, sequence: &BlockSequence, topics: &BTreeSet<String>) -> Arc<FlattenedView> {
        let id = sequence.id();
        let previous = self.memo.lock().touch(topics);

        let view = match previous {
            Some(previous) if previous.source == Some(id) => return previous,
            Some(previous) => match previous.source {
                Some(old) if old.lineage == id.lineage && old.len <= id.len => {
                    let mut view = FlattenedView::clone(&previous);
                    view.source = Some(id);
                    view.append_blocks(&sequence.blocks()[old.len..], topics);
                    tracing::debug!(
                        topics = topics.len(),
                        new_blocks = id.len - old.len,
                        "Extended flattened view"
                    );
                    view
                }
                _ => flatten_blocks(sequence, topics),
            },
            None => flatten_blocks(sequence, topics),
        };

        let mut memo = self.memo.lock();
        // A concurrent caller may have stored this exact view meanwhile.
        if let Some(current) = memo.touch(topics) {
            if current.source == Some(id) {
                return current;
            }
        }
        let view = Arc::new(view);
        memo.insert(topics, Arc::clone(&view), self.capacity);
        view
    }

    /// Drop every memoized view.
    pub fn clear(&self) {
        self.memo.lock().entries.clear();
    }

    /// Number of memoized topic sets.
    pub fn len(&self) -> usize {
        self.memo.lock().entries.len()
    }

    /// Whether nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.memo.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logstream_core::Timestamp;

    fn event(topic: &str, nanos: u64) -> MessageEvent {
        MessageEvent::new(topic, Timestamp::from_nanos(nanos), vec![nanos as u8], "x")
    }

    fn topics(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sequence(lineage: u64, blocks: Vec<Vec<MessageEvent>>) -> BlockSequence {
        let mut seq = BlockSequence::new(lineage, Timestamp::ZERO);
        seq.blocks = blocks
            .into_iter()
            .map(|events| Arc::new(MessageBlock::from_events(events)))
            .collect();
        seq
    }

    #[test]
    fn test_flatten_concatenates_in_block_order() {
        let seq = sequence(
            1,
            vec![vec![event("a", 1)], vec![event("a", 2), event("b", 3)]],
        );
        let view = flatten_blocks(&seq, &topics(&["a", "b"]));
        assert_eq!(view.get("a").unwrap(), &[event("a", 1), event("a", 2)]);
        assert_eq!(view.get("b").unwrap(), &[event("b", 3)]);
    }

    #[test]
    fn test_absent_topic_is_absent() {
        let seq = sequence(1, vec![vec![event("a", 1)]]);
        let view = flatten_blocks(&seq, &topics(&["a", "zzz"]));
        assert!(view.get("zzz").is_none());
        assert_eq!(view.topics().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_memo_returns_same_arc() {
        let cache = FlattenCache::new();
        let seq = sequence(1, vec![vec![event("a", 1)]]);
        let first = cache.flatten(&seq, &topics(&["a"]));
        let second = cache.flatten(&seq, &topics(&["a"]));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_growth_reuses_untouched_topics() {
        let cache = FlattenCache::new();
        let mut seq = sequence(1, vec![vec![event("a", 1), event("b", 2)]]);
        let before = cache.flatten(&seq, &topics(&["a", "b"]));

        seq.blocks
            .push(Arc::new(MessageBlock::from_events(vec![event("a", 3)])));
        let after = cache.flatten(&seq, &topics(&["a", "b"]));

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.get("a").unwrap().len(), 2);
        assert!(Arc::ptr_eq(&before.by_topic["b"], &after.by_topic["b"]));
        assert_eq!(*after, flatten_blocks(&seq, &topics(&["a", "b"])));
    }

    #[test]
    fn test_new_lineage_recomputes() {
        let cache = FlattenCache::new();
        let first = sequence(1, vec![vec![event("a", 1)], vec![event("a", 2)]]);
        cache.flatten(&first, &topics(&["a"]));

        let replaced = sequence(2, vec![vec![event("a", 9)]]);
        let view = cache.flatten(&replaced, &topics(&["a"]));
        assert_eq!(view.get("a").unwrap(), &[event("a", 9)]);
    }

    #[test]
    fn test_topic_sets_are_independent() {
        let cache = FlattenCache::new();
        let seq = sequence(1, vec![vec![event("a", 1), event("b", 2)]]);
        let only_a = cache.flatten(&seq, &topics(&["a"]));
        let both = cache.flatten(&seq, &topics(&["a", "b"]));
        assert_eq!(only_a.len(), 1);
        assert_eq!(both.len(), 2);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memo_is_bounded_by_capacity() {
        let cache = FlattenCache::new();
        let mut seq = sequence(1, vec![vec![event("a", 1)]]);
        for i in 0..1000 {
            let name = format!("t{}", i);
            cache.flatten(&seq, &topics(&["a", name.as_str()]));
            assert!(cache.len() <= DEFAULT_FLATTEN_CAPACITY);
        }
        seq.blocks
            .push(Arc::new(MessageBlock::from_events(vec![event("a", 2)])));
        cache.flatten(&seq, &topics(&["a"]));
        assert_eq!(cache.len(), DEFAULT_FLATTEN_CAPACITY);
    }

    #[test]
    fn test_least_recently_used_set_is_evicted() {
        let cache = FlattenCache::with_capacity(2);
        let seq = sequence(1, vec![vec![event("a", 1), event("b", 2), event("c", 3)]]);
        let a = cache.flatten(&seq, &topics(&["a"]));
        cache.flatten(&seq, &topics(&["b"]));
        // Touch "a" so "b" is the oldest.
        assert!(Arc::ptr_eq(&a, &cache.flatten(&seq, &topics(&["a"]))));
        cache.flatten(&seq, &topics(&["c"]));

        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&a, &cache.flatten(&seq, &topics(&["a"]))));
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_new_lineage_drops_old_entries() {
        let cache = FlattenCache::new();
        let first = sequence(1, vec![vec![event("a", 1), event("b", 2)]]);
        cache.flatten(&first, &topics(&["a"]));
        cache.flatten(&first, &topics(&["b"]));

        let replaced = sequence(2, vec![vec![event("a", 9)]]);
        cache.flatten(&replaced, &topics(&["a"]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_readers_share_views() {
        let cache = Arc::new(FlattenCache::new());
        let seq = Arc::new(sequence(1, vec![vec![event("a", 1), event("b", 2)]]));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "a" } else { "b" };
                    cache.flatten(&seq, &topics(&[name])).len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(cache.len(), 2);
        let a = cache.flatten(&seq, &topics(&["a"]));
        assert!(Arc::ptr_eq(&a, &cache.flatten(&seq, &topics(&["a"]))));
    }
}
