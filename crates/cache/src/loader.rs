//! Filling a block cache from a log source
//!
//! The log's time range is cut into equal windows and one block is sealed
//! per window, empty windows included, so block `i` always covers
//! `[start + i*d, start + (i+1)*d)`. The window length `d` is the configured
//! minimum, widened when needed so the log fits in `max_blocks` blocks.
//!
//! ```toml
//! # Shortest window per block in milliseconds (default: 100)
//! min_block_duration_ms = 100
//!
//! # Upper bound on blocks per log (default: 400)
//! max_blocks = 400
//! ```

use crate::block::BlockBuilder;
use crate::cache::BlockCache;
use crate::error::{CacheResult, LoaderConfigError};
use logstream_core::{Problem, Timestamp};
use logstream_source::{IteratorItem, LogSource, MessageIteratorArgs, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Block loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLoaderConfig {
    /// Shortest window covered by one block, in milliseconds (default: 100)
    #[serde(default = "default_min_block_duration_ms")]
    pub min_block_duration_ms: u64,

    /// Maximum number of blocks per log (default: 400)
    #[serde(default = "default_max_blocks")]
    pub max_blocks: u64,
}

fn default_min_block_duration_ms() -> u64 {
    100
}

fn default_max_blocks() -> u64 {
    400
}

impl Default for BlockLoaderConfig {
    fn default() -> Self {
        BlockLoaderConfig {
            min_block_duration_ms: default_min_block_duration_ms(),
            max_blocks: default_max_blocks(),
        }
    }
}

impl BlockLoaderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shortest block window (builder pattern).
    pub fn with_min_block_duration_ms(mut self, ms: u64) -> Self {
        self.min_block_duration_ms = ms;
        self
    }

    /// Set the block count limit (builder pattern).
    pub fn with_max_blocks(mut self, blocks: u64) -> Self {
        self.max_blocks = blocks;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), LoaderConfigError> {
        if self.min_block_duration_ms == 0 {
            return Err(LoaderConfigError::BlockDurationZero);
        }
        if self.max_blocks == 0 {
            return Err(LoaderConfigError::MaxBlocksZero);
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, LoaderConfigError> {
        let config: BlockLoaderConfig =
            toml::from_str(content).map_err(|e| LoaderConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LoaderConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoaderConfigError::Io(format!("'{}': {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// What one `load` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Blocks sealed and ingested
    pub blocks: usize,
    /// Messages placed into blocks
    pub messages: u64,
    /// Window length used for every block
    pub block_duration: Duration,
    /// Problems reported by the iterator
    pub problems: Vec<Problem>,
}

/// Reads a log source window by window into a [`BlockCache`].
#[derive(Debug, Clone, Default)]
pub struct BlockLoader {
    config: BlockLoaderConfig,
}

impl BlockLoader {
    /// Loader with the given configuration.
    pub fn new(config: BlockLoaderConfig) -> Self {
        BlockLoader { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &BlockLoaderConfig {
        &self.config
    }

    /// Window length for a log spanning `[start, end]`.
    pub fn block_duration(&self, start: Timestamp, end: Timestamp) -> Duration {
        let min = self.config.min_block_duration_ms.saturating_mul(1_000_000).max(1);
        let span = end
            .as_nanos()
            .saturating_sub(start.as_nanos())
            .saturating_add(1);
        let blocks = self.config.max_blocks.max(1);
        let fitted = span.saturating_add(blocks - 1) / blocks;
        Duration::from_nanos(min.max(fitted))
    }

    /// Replace the cache contents with blocks covering the whole log.
    ///
    /// `source` must be initialized. Blocks are ingested in time order as
    /// they are sealed, so readers can flatten a partially loaded log.
    pub fn load(
        &self,
        source: &LogSource,
        topics: &BTreeSet<String>,
        cache: &BlockCache,
    ) -> CacheResult<LoadSummary> {
        self.config.validate()?;
        let handle = source.handle().ok_or(SourceError::NotInitialized)?;
        let (start, end) = (handle.start(), handle.end());
        let duration = self.block_duration(start, end);

        let iterator = source.message_iterator(&MessageIteratorArgs {
            topics: topics.clone(),
            start: Some(start),
            end: Some(end),
        })?;
        cache.replace(Vec::new(), start);

        let mut summary = LoadSummary {
            block_duration: duration,
            ..LoadSummary::default()
        };
        let mut builder = BlockBuilder::new();
        let mut window_end = start.saturating_add(duration.saturating_sub(Timestamp::TICK));

        for item in iterator {
            match item {
                IteratorItem::MessageEvent(event) => {
                    while event.receive_time > window_end {
                        seal(cache, &mut builder, &mut summary);
                        window_end = window_end.saturating_add(duration);
                    }
                    summary.messages += 1;
                    builder.push(event);
                }
                IteratorItem::Problem(problem) => {
                    tracing::warn!(problem = %problem, "Problem while loading blocks");
                    summary.problems.push(problem);
                }
            }
        }
        loop {
            seal(cache, &mut builder, &mut summary);
            if window_end >= end {
                break;
            }
            window_end = window_end.saturating_add(duration);
        }

        tracing::info!(
            blocks = summary.blocks,
            messages = summary.messages,
            block_duration_ns = duration.as_nanos() as u64,
            "Loaded blocks"
        );
        Ok(summary)
    }
}

fn seal(cache: &BlockCache, builder: &mut BlockBuilder, summary: &mut LoadSummary) {
    let block = std::mem::take(builder).seal();
    cache.ingest(block);
    summary.blocks += 1;
}
