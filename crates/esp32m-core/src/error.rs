//! Errors raised by the struct codec.

use thiserror::Error;

/// Errors that can occur while building a schema or running the codec.
///
/// `SchemaMismatch` is raised whenever a recursive step expects a record
/// or a list and finds a non-null scalar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructError {
    /// A value did not have the shape the schema requires at this field.
    #[error("Schema mismatch at '{field}': expected {expected}, got {found}")]
    SchemaMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// The schema itself is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The schema nests deeper than [`crate::schema::MAX_DEPTH`].
    #[error("Schema nesting exceeds {max} levels")]
    TooDeep { max: usize },

    /// A wire-encoded diff could not be decoded.
    #[error("Invalid diff: {0}")]
    InvalidDiff(String),
}

impl StructError {
    pub(crate) fn mismatch(field: &str, expected: &'static str, found: &serde_json::Value) -> Self {
        StructError::SchemaMismatch {
            field: field.to_string(),
            expected,
            found: describe(found),
        }
    }
}

/// Short description of a JSON value for error messages.
fn describe(value: &serde_json::Value) -> String {
    let kind = match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    };
    let mut text = value.to_string();
    if text.len() > 40 {
        let mut cut = 40;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    format!("{kind} {text}")
}
