//! Transitive closure of complex types
//!
//! Segments that do not embed message definitions only record a type name
//! per topic. To parse such a topic the consumer needs every type reachable
//! from the root, serialized into one self-contained document.
//!
//! The closure is an arena keyed by type name: a type referenced by several
//! parents is stored once. Discovery order is breadth-first from the root,
//! which makes the serialized document stable for a given registry.

use crate::definition::{canonical_name, TypeDefinition};
use crate::error::{SchemaError, SchemaResult};
use crate::registry::TypeRegistry;
use std::collections::{HashMap, VecDeque};

/// Separator placed between definitions in a serialized closure.
pub const DEFINITION_SEPARATOR: &str =
    "================================================================================";

/// Schema encoding of documents produced by [`TypeClosure::stringify`].
pub const ROS2_MSG_ENCODING: &str = "ros2msg";

/// Root type plus every complex type it transitively references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeClosure {
    order: Vec<String>,
    types: HashMap<String, TypeDefinition>,
}

impl TypeClosure {
    /// The root definition.
    pub fn root(&self) -> &TypeDefinition {
        // `resolve` always seeds the arena with the root.
        &self.types[&self.order[0]]
    }

    /// Definitions in discovery order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.order.iter().map(move |name| &self.types[name])
    }

    /// Whether `name` is part of the closure.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of definitions including the root.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false; a closure contains at least its root.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Serialize into a single `.msg` document.
    ///
    /// The root body comes first; each dependency follows a separator line
    /// and a `MSG: <name>` header.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        for (idx, definition) in self.iter().enumerate() {
            if idx > 0 {
                out.push_str(DEFINITION_SEPARATOR);
                out.push('\n');
                out.push_str("MSG: ");
                out.push_str(&definition.name);
                out.push('\n');
            }
            out.push_str(&definition.to_msg_text());
        }
        out
    }

    /// Serialized document as schema bytes.
    pub fn to_schema_bytes(&self) -> Vec<u8> {
        self.stringify().into_bytes()
    }
}

/// Compute the closure of `root` against `registry`.
///
/// Fails with [`SchemaError::UnknownType`] when the root itself is absent and
/// with [`SchemaError::MissingSubtype`] when any reachable complex field names
/// a type the registry does not contain.
pub fn resolve(root: &str, registry: &TypeRegistry) -> SchemaResult<TypeClosure> {
    let root_def = registry
        .get(root)
        .ok_or_else(|| SchemaError::UnknownType(root.to_string()))?;

    let mut order = vec![root_def.name.clone()];
    let mut types = HashMap::new();
    types.insert(root_def.name.clone(), root_def.clone());

    let mut queue = VecDeque::from([root_def]);
    while let Some(current) = queue.pop_front() {
        for field in current.complex_fields() {
            if types.contains_key(canonical_name(&field.type_name).as_ref()) {
                continue;
            }
            let child = registry
                .get(&field.type_name)
                .ok_or_else(|| SchemaError::MissingSubtype {
                    type_name: field.type_name.clone(),
                    referenced_by: current.name.clone(),
                })?;
            order.push(child.name.clone());
            types.insert(child.name.clone(), child.clone());
            queue.push_back(child);
        }
    }

    tracing::debug!(root = %root, types = order.len(), "Resolved type closure");
    Ok(TypeClosure { order, types })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FieldDefinition;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.insert(TypeDefinition::new(
            "p/msg/Root",
            vec![
                FieldDefinition::new("a", "p/msg/A"),
                FieldDefinition::new("b", "p/msg/B"),
                FieldDefinition::new("n", "int32"),
            ],
        ));
        registry.insert(TypeDefinition::new(
            "p/msg/A",
            vec![FieldDefinition::new("shared", "p/msg/Leaf")],
        ));
        registry.insert(TypeDefinition::new(
            "p/msg/B",
            vec![FieldDefinition::new("shared", "p/msg/Leaf").array()],
        ));
        registry.insert(TypeDefinition::new(
            "p/msg/Leaf",
            vec![FieldDefinition::new("x", "float64")],
        ));
        registry
    }

    #[test]
    fn test_shared_subtype_stored_once() {
        let closure = resolve("p/msg/Root", &registry()).unwrap();
        let names: Vec<_> = closure.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["p/msg/Root", "p/msg/A", "p/msg/B", "p/msg/Leaf"]);
        assert_eq!(closure.root().name, "p/msg/Root");
    }

    #[test]
    fn test_missing_subtype_is_fatal() {
        let mut registry = registry();
        registry.insert(TypeDefinition::new(
            "p/msg/B",
            vec![FieldDefinition::new("gone", "p/msg/Gone")],
        ));
        let err = resolve("p/Root", &registry).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingSubtype {
                type_name: "p/msg/Gone".to_string(),
                referenced_by: "p/msg/B".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_root() {
        let err = resolve("UnknownType", &registry()).unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("UnknownType".to_string()));
    }

    #[test]
    fn test_stringify_layout() {
        let closure = resolve("p/msg/A", &registry()).unwrap();
        let expected = format!(
            "p/msg/Leaf shared\n{}\nMSG: p/msg/Leaf\nfloat64 x\n",
            DEFINITION_SEPARATOR
        );
        assert_eq!(closure.stringify(), expected);
    }

    #[test]
    fn test_stringify_parses_back() {
        let closure = resolve("p/msg/Root", &registry()).unwrap();
        let parsed = TypeRegistry::from_document("p/msg/Root", &closure.stringify()).unwrap();
        assert_eq!(parsed.len(), closure.len());
        for definition in closure.iter() {
            assert_eq!(parsed.get(&definition.name), Some(definition));
        }
    }
}
