//! Log source errors
//!
//! Only structural failures are errors. Anything that leaves part of the log
//! usable is reported as a [`logstream_core::Problem`] instead.

use crate::config::SourceConfigError;
use logstream_schema::SchemaError;

/// Result alias for log source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Fatal log source errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// `initialize` was called without any segment paths
    #[error("No segment files were provided")]
    NoSegments,

    /// Every segment failed to open
    #[error("None of the {attempted} segment(s) could be opened: {first_error}")]
    NoReadableSegments {
        /// Number of segments tried
        attempted: usize,
        /// Error reported by the first segment
        first_error: String,
    },

    /// The segments opened but contain no messages at all
    #[error("Log contains no messages")]
    NoMessages,

    /// An operation needs `initialize` to have succeeded first
    #[error("Log source is not initialized")]
    NotInitialized,

    /// `initialize` was called twice on the same source
    #[error("Log source is already initialized")]
    AlreadyInitialized,

    /// A segment query failed
    #[error("Segment {path}: {source}")]
    Segment {
        /// Segment file path
        path: String,
        /// Underlying database error
        #[source]
        source: rusqlite::Error,
    },

    /// A well-known type definition references a type that does not exist
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Invalid source configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] SourceConfigError),
}
