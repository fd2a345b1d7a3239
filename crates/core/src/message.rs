//! Message events and topic descriptions
//!
//! A [`MessageEvent`] is produced exactly once by a log source and handed to
//! a single consumer. Payload bytes are shared behind an `Arc` so that the
//! block cache and flattened views can hold the same event without copying.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One recorded message on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Topic the message was recorded on
    pub topic: String,
    /// Time the recorder received the message
    pub receive_time: Timestamp,
    /// Serialized payload, untouched
    pub message: Arc<[u8]>,
    /// Size of the payload in bytes
    pub size_in_bytes: usize,
    /// Declared type name of the topic
    pub schema_name: String,
}

impl MessageEvent {
    /// Build an event, deriving `size_in_bytes` from the payload.
    pub fn new(
        topic: impl Into<String>,
        receive_time: Timestamp,
        message: impl Into<Arc<[u8]>>,
        schema_name: impl Into<String>,
    ) -> Self {
        let message = message.into();
        MessageEvent {
            topic: topic.into(),
            receive_time,
            size_in_bytes: message.len(),
            message,
            schema_name: schema_name.into(),
        }
    }
}

/// A named channel of same-typed messages, with decoding information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Topic name, unique within a log
    pub name: String,
    /// Declared type name (e.g. `sensor_msgs/msg/Image`)
    pub schema_name: String,
    /// Serialization format of the payloads (e.g. `cdr`)
    pub message_encoding: String,
    /// Self-contained schema document, when one could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_data: Option<Vec<u8>>,
    /// Encoding of `schema_data` (e.g. `ros2msg`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_encoding: Option<String>,
}

impl Topic {
    /// Topic without schema information.
    pub fn new(
        name: impl Into<String>,
        schema_name: impl Into<String>,
        message_encoding: impl Into<String>,
    ) -> Self {
        Topic {
            name: name.into(),
            schema_name: schema_name.into(),
            message_encoding: message_encoding.into(),
            schema_data: None,
            schema_encoding: None,
        }
    }

    /// Whether the payloads of this topic can be parsed.
    pub fn has_schema(&self) -> bool {
        self.schema_data.is_some()
    }
}

/// Per-topic statistics gathered at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    /// Number of messages recorded on the topic across all segments
    pub num_messages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_size_matches_payload() {
        let event = MessageEvent::new("/a", Timestamp::new(1, 0), vec![1u8, 2, 3], "std_msgs/msg/String");
        assert_eq!(event.size_in_bytes, 3);
        assert_eq!(&event.message[..], &[1, 2, 3]);
    }

    #[test]
    fn test_event_clone_shares_payload() {
        let event = MessageEvent::new("/a", Timestamp::ZERO, vec![0u8; 64], "t");
        let copy = event.clone();
        assert!(Arc::ptr_eq(&event.message, &copy.message));
    }

    #[test]
    fn test_topic_without_schema() {
        let topic = Topic::new("/camera", "sensor_msgs/msg/Image", "cdr");
        assert!(!topic.has_schema());
        let json = serde_json::to_string(&topic).unwrap();
        assert!(!json.contains("schema_data"));
    }
}
