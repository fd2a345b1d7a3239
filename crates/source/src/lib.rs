//! rosbag2 log source for logstream
//!
//! Opens one or more `.db3` segments of a single recording and exposes them
//! as one time-ordered log:
//!
//! - `LogSource`: initialize, iterate, backfill, close
//! - `MessageIterator`: lazy k-way merge across segments with paged reads
//! - `MessageStream`: the same iterator consumed from async code
//! - `SourceConfig`: page and buffer sizes, loadable from TOML
//!
//! # Example
//!
//! ```ignore
//! use logstream_source::{LogSource, MessageIteratorArgs};
//!
//! let mut source = LogSource::new(["bag_0.db3", "bag_1.db3"]);
//! let init = source.initialize()?;
//! for item in source.message_iterator(&MessageIteratorArgs::new(["/camera"]))? {
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handle;
pub mod iterator;
pub mod segment;
pub mod source;
pub mod stream;
pub mod testing;

pub use config::{SourceConfig, SourceConfigError};
pub use error::{SourceError, SourceResult};
pub use handle::LogHandle;
pub use iterator::{IteratorItem, MessageIterator};
pub use segment::{EmbeddedDefinition, MessageRow, Segment, SegmentTopic};
pub use source::{Initialization, LogSource, MessageIteratorArgs, ROS2_PROFILE};
pub use stream::MessageStream;
