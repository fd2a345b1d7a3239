//! `.msg` definition parser
//!
//! Accepts the ROS message grammar used by rosbag2 and by the well-known type
//! table:
//!
//! ```text
//! # comment
//! std_msgs/Header header        complex field, package-relative or qualified
//! uint8[] data                  unbounded sequence
//! float64[36] covariance        fixed-size array
//! int32[<=4] samples            bounded sequence
//! string<=16 label              bounded string
//! float64 w 1                   default value
//! uint8 INT8=1                  constant
//! ```
//!
//! A *document* is several definitions joined by `=`-rule separator lines,
//! each dependency introduced by `MSG: <name>`.

use crate::definition::{canonical_name, is_primitive, package_of, qualify};
use crate::definition::{FieldDefinition, TypeDefinition};
use crate::error::{SchemaError, SchemaResult};

/// Parse the body of a single definition.
pub fn parse_definition(type_name: &str, text: &str) -> SchemaResult<TypeDefinition> {
    let name = canonical_name(type_name).into_owned();
    let package = package_of(&name).map(str::to_string);

    let mut definitions = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        definitions.push(parse_line(&name, package.as_deref(), line, idx + 1)?);
    }

    Ok(TypeDefinition { name, definitions })
}

/// Parse a multi-definition document whose first section is `root_name`.
pub fn parse_document(root_name: &str, text: &str) -> SchemaResult<Vec<TypeDefinition>> {
    let mut types = Vec::new();
    let mut current_name = root_name.to_string();
    let mut body = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if is_separator(trimmed) {
            types.push(parse_definition(&current_name, &body)?);
            body.clear();
            current_name.clear();
            continue;
        }
        if current_name.is_empty() {
            if let Some(name) = trimmed.strip_prefix("MSG:") {
                current_name = name.trim().to_string();
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
            return Err(SchemaError::Parse {
                type_name: root_name.to_string(),
                line: 0,
                detail: format!("expected `MSG:` header, found `{}`", trimmed),
            });
        }
        body.push_str(line);
        body.push('\n');
    }

    if !current_name.is_empty() {
        types.push(parse_definition(&current_name, &body)?);
    }
    Ok(types)
}

fn is_separator(line: &str) -> bool {
    line.len() >= 3 && line.bytes().all(|b| b == b'=')
}

fn parse_line(
    type_name: &str,
    package: Option<&str>,
    line: &str,
    line_no: usize,
) -> SchemaResult<FieldDefinition> {
    let err = |detail: String| SchemaError::Parse {
        type_name: type_name.to_string(),
        line: line_no,
        detail,
    };

    let (type_token, rest) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| err(format!("expected `<type> <name>`, found `{}`", line)))?;
    let rest = rest.trim_start();

    let (base, array) = split_array(type_token).map_err(&err)?;
    let (base, upper_bound) = split_string_bound(base).map_err(&err)?;

    let is_complex = !is_primitive(base);
    let mut field = FieldDefinition::new(
        "",
        if is_complex {
            qualify(base, package)
        } else {
            base.to_string()
        },
    );
    field.upper_bound = upper_bound;
    if let Some(spec) = array {
        field.is_array = true;
        field.array_length = spec.length;
        field.array_upper_bound = spec.upper_bound;
    }

    if let Some((lhs, value)) = rest.split_once('=') {
        let name = lhs.trim();
        if !name.is_empty() && !name.contains(char::is_whitespace) {
            // String constants keep everything after `=`, including `#`.
            let value = if base == "string" || base == "wstring" {
                value.trim()
            } else {
                strip_comment(value).trim()
            };
            field.name = name.to_string();
            field.constant_value = Some(value.to_string());
            return Ok(field);
        }
    }

    let body = strip_comment(rest).trim();
    let (name, default) = match body.split_once(char::is_whitespace) {
        Some((name, default)) => (name, Some(default.trim().to_string())),
        None => (body, None),
    };
    if name.is_empty() {
        return Err(err(format!("missing field name in `{}`", line)));
    }
    field.name = name.to_string();
    field.default_value = default;
    Ok(field)
}

struct ArraySpec {
    length: Option<usize>,
    upper_bound: Option<usize>,
}

fn split_array(token: &str) -> Result<(&str, Option<ArraySpec>), String> {
    let Some(inner) = token.strip_suffix(']') else {
        return Ok((token, None));
    };
    let open = inner
        .rfind('[')
        .ok_or_else(|| format!("unbalanced array brackets in `{}`", token))?;
    let (base, size) = (&inner[..open], &inner[open + 1..]);

    let spec = if size.is_empty() {
        ArraySpec {
            length: None,
            upper_bound: None,
        }
    } else if let Some(bound) = size.strip_prefix("<=") {
        ArraySpec {
            length: None,
            upper_bound: Some(parse_size(bound, token)?),
        }
    } else {
        ArraySpec {
            length: Some(parse_size(size, token)?),
            upper_bound: None,
        }
    };
    Ok((base, Some(spec)))
}

fn split_string_bound(base: &str) -> Result<(&str, Option<usize>), String> {
    match base.split_once("<=") {
        Some((ty, bound)) => Ok((ty, Some(parse_size(bound, base)?))),
        None => Ok((base, None)),
    }
}

fn parse_size(text: &str, token: &str) -> Result<usize, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid size `{}` in `{}`", text, token))
}

fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(pos) => &text[..pos],
        None => text,
    }
}
