//! Log source configuration.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! # Rows fetched per segment query while iterating (default: 256)
//! page_size = 256
//!
//! # Items buffered between the reader task and an async consumer (default: 64)
//! stream_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log source configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Rows fetched per segment query (default: 256).
    ///
    /// Each cursor holds at most one page of payloads in memory.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Capacity of the channel behind [`crate::MessageStream`] (default: 64).
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

fn default_page_size() -> usize {
    256
}

fn default_stream_capacity() -> usize {
    64
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            page_size: default_page_size(),
            stream_capacity: default_stream_capacity(),
        }
    }
}

impl SourceConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rows per segment query (builder pattern).
    pub fn with_page_size(mut self, rows: usize) -> Self {
        self.page_size = rows;
        self
    }

    /// Set async stream buffer size (builder pattern).
    pub fn with_stream_capacity(mut self, items: usize) -> Self {
        self.stream_capacity = items;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), SourceConfigError> {
        if self.page_size == 0 {
            return Err(SourceConfigError::PageSizeZero);
        }
        if self.stream_capacity == 0 {
            return Err(SourceConfigError::StreamCapacityZero);
        }
        Ok(())
    }

    /// Create a configuration with tiny pages so tests cross page boundaries.
    pub fn for_testing() -> Self {
        SourceConfig {
            page_size: 2,
            stream_capacity: 1,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, SourceConfigError> {
        let config: SourceConfig =
            toml::from_str(content).map_err(|e| SourceConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SourceConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SourceConfigError::Io(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceConfigError {
    /// Page size must be positive.
    #[error("page_size must be at least 1")]
    PageSizeZero,

    /// Stream capacity must be positive.
    #[error("stream_capacity must be at least 1")]
    StreamCapacityZero,

    /// TOML could not be parsed.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config file could not be read.
    #[error("{0}")]
    Io(String),
}
