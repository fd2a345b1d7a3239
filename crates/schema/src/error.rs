//! Schema resolution errors.

/// Errors raised while parsing or resolving type definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The requested root type is not in the registry
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A complex field references a type the registry does not contain.
    ///
    /// Indicates a corrupt or incomplete registry.
    #[error("Subtype {type_name} of type {referenced_by} not found")]
    MissingSubtype {
        /// The missing type
        type_name: String,
        /// The type whose field referenced it
        referenced_by: String,
    },

    /// A definition line could not be parsed
    #[error("Invalid definition for {type_name} at line {line}: {detail}")]
    Parse {
        /// Type being parsed
        type_name: String,
        /// 1-based line number within the definition
        line: usize,
        /// What went wrong
        detail: String,
    },
}

/// Result alias for schema operations.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
