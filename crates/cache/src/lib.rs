//! Incremental block cache for logstream
//!
//! Messages read from a log source are sealed into blocks and appended to a
//! per-log sequence. Consumers that need whole-log data per topic (plots,
//! tables) ask for a flattened view, memoized per topic set:
//!
//! - `MessageBlock` / `BlockSequence`: sealed batches and their identity
//! - `BlockCache`: append-only sequence with `Arc` snapshots
//! - `FlattenCache` / `FlattenedView`: memoized per-topic concatenation
//! - `BlockLoader`: fills a cache from an initialized `LogSource`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod cache;
pub mod error;
pub mod flatten;
pub mod loader;

pub use block::{BlockBuilder, BlockSequence, MessageBlock, SequenceId};
pub use cache::BlockCache;
pub use error::{CacheError, CacheResult, LoaderConfigError};
pub use flatten::{flatten_blocks, FlattenCache, FlattenedView, DEFAULT_FLATTEN_CAPACITY};
pub use loader::{BlockLoader, BlockLoaderConfig, LoadSummary};
