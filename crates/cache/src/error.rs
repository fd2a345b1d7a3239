//! Block cache errors

use logstream_source::SourceError;

/// Result alias for block cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised while filling the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading from the log source failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Invalid loader configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] LoaderConfigError),
}

/// Loader configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderConfigError {
    /// Block duration must be at least one nanosecond
    #[error("min_block_duration_ms must be greater than zero")]
    BlockDurationZero,

    /// At least one block is needed
    #[error("max_blocks must be greater than zero")]
    MaxBlocksZero,

    /// TOML could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Io(String),
}
