//! logstream - streaming reader and media decode pipeline for robotics logs
//!
//! logstream opens segmented ROS 2 recordings (rosbag2 `.db3` files) as one
//! time-ordered log and turns their image and video topics into bitmaps.
//!
//! # Quick Start
//!
//! ```ignore
//! use logstream::{LogSource, MessageIteratorArgs, decode_raw, RawImage, RawImageOptions};
//!
//! let mut source = LogSource::new(["recording_0.db3", "recording_1.db3"]);
//! let init = source.initialize()?;
//! for problem in &init.problems {
//!     eprintln!("{}", problem);
//! }
//!
//! for item in source.message_iterator(&MessageIteratorArgs::new(["/camera/image"]))? {
//!     // ...
//! }
//! ```
//!
//! # Architecture
//!
//! - [`schema`]: type definitions and schema resolution
//! - [`source`]: segment reading, iteration and backfill
//! - [`cache`]: block cache and flattened per-topic views
//! - [`decode`]: raw, compressed and H.264 video decoding
//!
//! Shared types ([`Timestamp`], [`MessageEvent`], [`Problem`]) live in
//! [`core`].

pub use logstream_cache as cache;
pub use logstream_core as core;
pub use logstream_decode as decode;
pub use logstream_schema as schema;
pub use logstream_source as source;

pub use logstream_cache::{BlockCache, BlockLoader, BlockLoaderConfig, FlattenedView, MessageBlock};
pub use logstream_core::{MessageEvent, Problem, Severity, Timestamp, Topic, TopicStats};
pub use logstream_decode::{
    decode_compressed_image, decode_compressed_video, decode_raw, decode_raw_image, Bitmap,
    CompressedVideo, DecodeError, RawImage, RawImageOptions, VideoDecoder, VideoDecoderSession,
};
pub use logstream_schema::{resolve, well_known, SchemaError, TypeRegistry};
pub use logstream_source::{
    Initialization, IteratorItem, LogSource, MessageIterator, MessageIteratorArgs, MessageStream,
    SourceConfig, SourceError,
};
