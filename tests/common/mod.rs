//! Shared test utilities for the root integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use logstream::source::testing::BagWriter;
use std::path::PathBuf;
use tempfile::TempDir;

/// One message to record: topic, receive time in nanoseconds, payload.
pub type Record<'a> = (&'a str, i64, Vec<u8>);

/// A recording split over one or more segment files in a temp directory.
pub struct TestLog {
    pub dir: TempDir,
    pub paths: Vec<PathBuf>,
}

impl TestLog {
    /// Write `segments`, each declaring every topic in `topics`.
    pub fn new(topics: &[(&str, &str)], segments: &[Vec<Record<'_>>]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut paths = Vec::new();
        for (index, records) in segments.iter().enumerate() {
            let path = dir.path().join(format!("recording_{}.db3", index));
            let mut writer = BagWriter::create(&path).expect("Failed to create segment");
            for (name, type_name) in topics {
                writer
                    .add_topic(name, type_name, "cdr")
                    .expect("Failed to add topic");
            }
            for (topic, timestamp, data) in records {
                writer
                    .write(topic, *timestamp, data)
                    .expect("Failed to write message");
            }
            writer.finish().expect("Failed to close segment");
            paths.push(path);
        }
        TestLog { dir, paths }
    }
}

/// Milliseconds to segment nanoseconds.
pub fn ms(millis: i64) -> i64 {
    millis * 1_000_000
}
