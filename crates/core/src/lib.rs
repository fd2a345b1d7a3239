//! Core types for logstream
//!
//! This crate defines the foundational types shared by every stage of the
//! pipeline:
//! - Timestamp: nanosecond receive time
//! - MessageEvent: one recorded message with its raw payload
//! - Topic / TopicStats: channel description and per-topic counts
//! - Problem / Severity: non-fatal diagnostics returned to callers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod problem;
pub mod time;

pub use message::{MessageEvent, Topic, TopicStats};
pub use problem::{Problem, Severity};
pub use time::Timestamp;
