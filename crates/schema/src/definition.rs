//! Type and field definitions
//!
//! A [`TypeDefinition`] is a named, ordered list of fields. Fields whose type
//! is another named type are *complex*; everything else is a primitive.
//! Complex type names are always stored in canonical `pkg/msg/Type` form so
//! that lookups are independent of how a definition spelled them.

use std::borrow::Cow;
use std::fmt;

/// Primitive field types understood by the ROS message grammar.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "byte", "char", "int8", "uint8", "int16", "uint16", "int32", "uint32", "int64",
    "uint64", "float32", "float64", "string", "wstring", "time", "duration",
];

/// Whether `type_name` is a primitive (not a reference to another type).
pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// Canonical form of a complex type name.
///
/// `pkg/Type` becomes `pkg/msg/Type`; names that already carry an interface
/// kind (`pkg/msg/Type`, `pkg/srv/Type`) and bare names are returned as-is.
pub fn canonical_name(name: &str) -> Cow<'_, str> {
    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(pkg), Some(ty), None) if !pkg.is_empty() && !ty.is_empty() => {
            Cow::Owned(format!("{}/msg/{}", pkg, ty))
        }
        _ => Cow::Borrowed(name),
    }
}

/// Package part of a canonical type name.
pub fn package_of(name: &str) -> Option<&str> {
    name.split_once('/').map(|(pkg, _)| pkg)
}

/// Resolve a complex type reference as written inside package `package`.
///
/// A bare `Header` always means `std_msgs/msg/Header`.
pub fn qualify(type_name: &str, package: Option<&str>) -> String {
    if type_name.contains('/') {
        return canonical_name(type_name).into_owned();
    }
    if type_name == "Header" {
        return "std_msgs/msg/Header".to_string();
    }
    match package {
        Some(pkg) => format!("{}/msg/{}", pkg, type_name),
        None => type_name.to_string(),
    }
}

/// One field (or constant) of a type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field name
    pub name: String,
    /// Primitive name or canonical complex type name
    pub type_name: String,
    /// Whether `type_name` references another definition
    pub is_complex: bool,
    /// Whether the field is a sequence
    pub is_array: bool,
    /// Fixed length for `T[N]` arrays
    pub array_length: Option<usize>,
    /// Bound for `T[<=N]` arrays
    pub array_upper_bound: Option<usize>,
    /// Bound for `string<=N`
    pub upper_bound: Option<usize>,
    /// Constant value text for `T NAME=value`
    pub constant_value: Option<String>,
    /// Default value text for `T name value`
    pub default_value: Option<String>,
}

impl FieldDefinition {
    /// Plain scalar field.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        FieldDefinition {
            name: name.into(),
            is_complex: !is_primitive(&type_name),
            type_name,
            is_array: false,
            array_length: None,
            array_upper_bound: None,
            upper_bound: None,
            constant_value: None,
            default_value: None,
        }
    }

    /// Unbounded sequence of this field's type.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Whether this entry is a constant rather than a field.
    pub fn is_constant(&self) -> bool {
        self.constant_value.is_some()
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(bound) = self.upper_bound {
            write!(f, "<={}", bound)?;
        }
        if self.is_array {
            match (self.array_length, self.array_upper_bound) {
                (Some(len), _) => write!(f, "[{}]", len)?,
                (None, Some(bound)) => write!(f, "[<={}]", bound)?,
                (None, None) => write!(f, "[]")?,
            }
        }
        match (&self.constant_value, &self.default_value) {
            (Some(value), _) => write!(f, " {}={}", self.name, value),
            (None, Some(default)) => write!(f, " {} {}", self.name, default),
            (None, None) => write!(f, " {}", self.name),
        }
    }
}

/// A named type with ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    /// Canonical type name
    pub name: String,
    /// Fields and constants in declaration order
    pub definitions: Vec<FieldDefinition>,
}

impl TypeDefinition {
    /// Create a definition.
    pub fn new(name: impl Into<String>, definitions: Vec<FieldDefinition>) -> Self {
        TypeDefinition {
            name: canonical_name(&name.into()).into_owned(),
            definitions,
        }
    }

    /// Complex types referenced by non-constant fields, in field order.
    pub fn complex_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions
            .iter()
            .filter(|field| field.is_complex && !field.is_constant())
    }

    /// Definition body in `.msg` syntax, one entry per line.
    pub fn to_msg_text(&self) -> String {
        let mut out = String::new();
        for field in &self.definitions {
            out.push_str(&field.to_string());
            out.push('\n');
        }
        out
    }
}
