//! Argument validation for tool invocations.
//!
//! Runs before any backend call. A failure here means the network is never
//! touched.

use serde_json::Value;

use lightrag_core::{GatewayError, JsonObject, QueryMode, Result};

/// Shape and range a single argument must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// String that is non-empty after trimming.
    Text,
    /// Any string.
    String,
    /// Integer within an inclusive range.
    Integer { min: i64, max: Option<i64> },
    /// Boolean, `false` when absent.
    Flag,
    /// JSON object.
    Object,
    /// One of the query mode names.
    Mode,
    /// Non-empty array of `{title?, content, metadata?}` objects.
    Documents,
}

/// One declared tool argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
    pub constraint: Constraint,
}

impl Param {
    pub const fn required(name: &'static str, constraint: Constraint) -> Self {
        Self {
            name,
            required: true,
            constraint,
        }
    }

    pub const fn optional(name: &'static str, constraint: Constraint) -> Self {
        Self {
            name,
            required: false,
            constraint,
        }
    }
}

/// Check `arguments` against the declared params.
///
/// Absent arguments are treated as an empty object. On success returns the
/// argument object with `null` entries removed, so optional params that were
/// sent as `null` read as absent downstream.
pub fn validate(params: &[Param], arguments: &Value) -> Result<JsonObject> {
    let mut arguments = match arguments {
        Value::Null => JsonObject::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(GatewayError::validation(format!(
                "Arguments must be a JSON object, got {}",
                json_type(other)
            )))
        }
    };
    arguments.retain(|_, value| !value.is_null());

    let missing: Vec<&str> = params
        .iter()
        .filter(|p| p.required && !arguments.contains_key(p.name))
        .map(|p| p.name)
        .collect();
    if !missing.is_empty() {
        return Err(GatewayError::validation(format!(
            "Missing required arguments: {}",
            missing.join(", ")
        )));
    }

    for param in params {
        if let Some(value) = arguments.get(param.name) {
            check(param, value)?;
        }
    }

    Ok(arguments)
}

fn check(param: &Param, value: &Value) -> Result<()> {
    let name = param.name;
    match param.constraint {
        Constraint::Text => match value.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(()),
            Some(_) => Err(invalid(format!("'{}' must not be empty", name))),
            None => Err(wrong_type(name, "a string", value)),
        },
        Constraint::String => match value {
            Value::String(_) => Ok(()),
            _ => Err(wrong_type(name, "a string", value)),
        },
        Constraint::Integer { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| wrong_type(name, "an integer", value))?;
            match max {
                Some(max) if n < min || n > max => Err(invalid(format!(
                    "'{}' must be between {} and {}, got {}",
                    name, min, max, n
                ))),
                None if n < min => Err(invalid(format!("'{}' must be at least {}, got {}", name, min, n))),
                _ => Ok(()),
            }
        }
        Constraint::Flag => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(wrong_type(name, "a boolean", value)),
        },
        Constraint::Object => match value {
            Value::Object(_) => Ok(()),
            _ => Err(wrong_type(name, "an object", value)),
        },
        Constraint::Mode => {
            let mode = value
                .as_str()
                .ok_or_else(|| wrong_type(name, "a string", value))?;
            mode.parse::<QueryMode>().map(|_| ()).map_err(invalid)
        }
        Constraint::Documents => check_documents(name, value),
    }
}

fn check_documents(name: &str, value: &Value) -> Result<()> {
    let items = value
        .as_array()
        .ok_or_else(|| wrong_type(name, "an array", value))?;
    if items.is_empty() {
        return Err(invalid(format!("'{}' must contain at least one document", name)));
    }

    for (index, item) in items.iter().enumerate() {
        let doc = item
            .as_object()
            .ok_or_else(|| invalid(format!("'{}[{}]' must be an object", name, index)))?;

        match doc.get("content").and_then(Value::as_str) {
            Some(content) if !content.trim().is_empty() => {}
            _ => {
                return Err(invalid(format!(
                    "'{}[{}]' must have non-empty 'content'",
                    name, index
                )))
            }
        }
        if !matches!(doc.get("title"), None | Some(Value::Null) | Some(Value::String(_))) {
            return Err(invalid(format!("'{}[{}].title' must be a string", name, index)));
        }
        if !matches!(doc.get("metadata"), None | Some(Value::Null) | Some(Value::Object(_))) {
            return Err(invalid(format!("'{}[{}].metadata' must be an object", name, index)));
        }
    }
    Ok(())
}

fn invalid(message: String) -> GatewayError {
    GatewayError::validation(message)
}

fn wrong_type(name: &str, expected: &str, value: &Value) -> GatewayError {
    invalid(format!("'{}' must be {}, got {}", name, expected, json_type(value)))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
