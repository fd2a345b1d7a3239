//! Message schema resolution for logstream
//!
//! This crate turns a topic's declared type name into a self-contained
//! schema document:
//!
//! - Definitions: `TypeDefinition` / `FieldDefinition` with canonical names
//! - Parser: ROS `.msg` bodies and multi-definition documents
//! - Registry: definitions keyed by canonical name
//! - Resolver: breadth-first closure of complex types and stable serialization
//! - Well-known types: ROS 2 definitions for segments that embed none

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod definition;
pub mod error;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod well_known;

pub use definition::{canonical_name, FieldDefinition, TypeDefinition};
pub use error::{SchemaError, SchemaResult};
pub use parser::{parse_definition, parse_document};
pub use registry::TypeRegistry;
pub use resolver::{resolve, TypeClosure, DEFINITION_SEPARATOR, ROS2_MSG_ENCODING};
pub use well_known::{well_known, WELL_KNOWN_DEFINITIONS};
