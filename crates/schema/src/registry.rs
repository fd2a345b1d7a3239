//! Type registry keyed by canonical type name

use crate::definition::{canonical_name, TypeDefinition};
use crate::error::SchemaResult;
use crate::parser::parse_document;
use std::collections::BTreeMap;

/// A set of known type definitions.
///
/// Lookups accept both `pkg/Type` and `pkg/msg/Type` spellings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a multi-definition document rooted at `root_name`.
    pub fn from_document(root_name: &str, text: &str) -> SchemaResult<Self> {
        let mut registry = Self::new();
        for definition in parse_document(root_name, text)? {
            registry.insert(definition);
        }
        Ok(registry)
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, definition: TypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }

    /// Merge another registry into this one; entries in `other` win.
    pub fn extend(&mut self, other: TypeRegistry) {
        self.types.extend(other.types);
    }

    /// Look up a definition by any accepted spelling.
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(canonical_name(name).as_ref())
    }

    /// Whether a definition exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }
}
