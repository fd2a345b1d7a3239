//! Topic schemas produced by initialization.

use crate::common::{ms, TestLog};
use logstream::{resolve, well_known, LogSource, Severity};

#[test]
fn test_topics_carry_resolved_schema_documents() {
    let log = TestLog::new(
        &[
            ("/camera/compressed", "sensor_msgs/msg/CompressedImage"),
            ("/custom", "UnknownType"),
        ],
        &[vec![
            ("/camera/compressed", ms(1), vec![0]),
            ("/custom", ms(2), vec![0]),
        ]],
    );
    let mut source = LogSource::new(log.paths.clone());
    let init = source.initialize().unwrap();

    let camera = init
        .topics
        .iter()
        .find(|t| t.name == "/camera/compressed")
        .unwrap();
    let expected = resolve("sensor_msgs/msg/CompressedImage", well_known())
        .unwrap()
        .to_schema_bytes();
    assert_eq!(camera.schema_data.as_deref(), Some(expected.as_slice()));
    assert_eq!(camera.schema_encoding.as_deref(), Some("ros2msg"));

    let custom = init.topics.iter().find(|t| t.name == "/custom").unwrap();
    assert!(custom.schema_data.is_none());
    assert_eq!(init.problems.len(), 1);
    assert_eq!(init.problems[0].severity, Severity::Warn);
    assert!(init.problems[0].message.contains("/custom"));
}
