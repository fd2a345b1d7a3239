//! Filling the block cache from a recording.

use crate::common::{ms, TestLog};
use logstream::{BlockCache, BlockLoader, BlockLoaderConfig, LogSource};
use std::collections::BTreeSet;
use std::sync::Arc;

#[test]
fn test_loader_and_flatten_match_iteration() {
    let log = TestLog::new(
        &[("/a", "std_msgs/msg/Float64"), ("/b", "std_msgs/msg/Float64")],
        &[
            vec![("/a", ms(0), vec![1]), ("/b", ms(150), vec![2])],
            vec![("/a", ms(120), vec![3]), ("/a", ms(420), vec![4])],
        ],
    );
    let mut source = LogSource::new(log.paths.clone());
    source.initialize().unwrap();

    let topics: BTreeSet<String> = ["/a".to_string(), "/b".to_string()].into_iter().collect();
    let cache = BlockCache::default();
    let loader = BlockLoader::new(BlockLoaderConfig::new().with_min_block_duration_ms(100));
    let summary = loader.load(&source, &topics, &cache).unwrap();
    assert_eq!(summary.blocks, 5);
    assert_eq!(summary.messages, 4);

    let view = cache.flatten(&topics);
    let a: Vec<u8> = view.get("/a").unwrap().iter().map(|e| e.message[0]).collect();
    let b: Vec<u8> = view.get("/b").unwrap().iter().map(|e| e.message[0]).collect();
    assert_eq!(a, vec![1, 3, 4]);
    assert_eq!(b, vec![2]);

    // Unchanged sequence, same memoized view.
    assert!(Arc::ptr_eq(&view, &cache.flatten(&topics)));
}
