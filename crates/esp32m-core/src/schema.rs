//! Positional field schemas.
//!
//! A schema is an ordered list of fields. The position of a field is its
//! index in array form and its key in a diff, so the order is part of the
//! wire contract: reordering fields invalidates stored diffs.
//!
//! Schemas are usually shipped in the compact tuple notation used by the
//! device firmware and the web UI:
//!
//! ```text
//! [["name"], ["nested", [["x"], ["y"]]], ["list", null, {"array": true}]]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::error::StructError;

/// Maximum nesting depth of a schema. Every codec operation recurses once
/// per nesting level, so this also bounds recursion.
pub const MAX_DEPTH: usize = 32;

/// Per-field options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// The field holds an ordered list of like-shaped items.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,
}

/// A single field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    children: Option<Schema>,
    options: FieldOptions,
}

impl Field {
    /// A plain value field.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            children: None,
            options: FieldOptions::default(),
        }
    }

    /// A field holding a nested record.
    pub fn record(key: impl Into<String>, children: Schema) -> Self {
        Self {
            key: key.into(),
            children: Some(children),
            options: FieldOptions::default(),
        }
    }

    /// A field holding an opaque list of values.
    pub fn list(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            children: None,
            options: FieldOptions { array: true },
        }
    }

    /// A field holding a list of nested records.
    pub fn records(key: impl Into<String>, children: Schema) -> Self {
        Self {
            key: key.into(),
            children: Some(children),
            options: FieldOptions { array: true },
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn children(&self) -> Option<&Schema> {
        self.children.as_ref()
    }

    pub fn options(&self) -> FieldOptions {
        self.options
    }

    pub fn is_array(&self) -> bool {
        self.options.array
    }

    /// Field holds a single nested record.
    pub fn is_record(&self) -> bool {
        self.children.is_some() && !self.options.array
    }

    fn to_json(&self) -> Value {
        let mut tuple = vec![Value::String(self.key.clone())];
        if self.children.is_some() || self.options.array {
            tuple.push(self.children.as_ref().map_or(Value::Null, Schema::to_json));
        }
        if self.options.array {
            tuple.push(json!({ "array": true }));
        }
        Value::Array(tuple)
    }

    fn from_json(value: &Value) -> Result<Self, StructError> {
        let tuple = value.as_array().ok_or_else(|| {
            StructError::InvalidSchema(format!("field must be an array, got {value}"))
        })?;
        let key = tuple
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| StructError::InvalidSchema(format!("field name missing in {value}")))?;
        let children = match tuple.get(1) {
            None | Some(Value::Null) => None,
            Some(children) => Some(Schema::from_json(children)?),
        };
        let options = match tuple.get(2) {
            None | Some(Value::Null) => FieldOptions::default(),
            Some(options) => serde_json::from_value(options.clone()).map_err(|e| {
                StructError::InvalidSchema(format!("bad options for '{key}': {e}"))
            })?,
        };
        Ok(Self {
            key: key.to_string(),
            children,
            options,
        })
    }
}

/// An ordered, validated list of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Schema {
    fields: Vec<Field>,
    depth: usize,
}

impl Schema {
    /// Build a schema, rejecting duplicate keys and excessive nesting.
    pub fn new(fields: Vec<Field>) -> Result<Self, StructError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.key.as_str()) {
                return Err(StructError::InvalidSchema(format!(
                    "duplicate field '{}'",
                    field.key
                )));
            }
        }

        let depth = 1 + fields
            .iter()
            .filter_map(|f| f.children.as_ref())
            .map(|c| c.depth)
            .max()
            .unwrap_or(0);
        if depth > MAX_DEPTH {
            return Err(StructError::TooDeep { max: MAX_DEPTH });
        }

        Ok(Self { fields, depth })
    }

    /// Parse the compact tuple notation.
    pub fn from_json(value: &Value) -> Result<Self, StructError> {
        let items = value.as_array().ok_or_else(|| {
            StructError::InvalidSchema(format!("schema must be an array, got {value}"))
        })?;
        let fields = items
            .iter()
            .map(Field::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(fields)
    }

    /// Render the compact tuple notation.
    pub fn to_json(&self) -> Value {
        Value::Array(self.fields.iter().map(Field::to_json).collect())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    /// Position of the field with the given key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Nesting depth; a flat schema has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl TryFrom<Value> for Schema {
    type Error = StructError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Schema::from_json(&value)
    }
}

impl From<Schema> for Value {
    fn from(schema: Schema) -> Self {
        schema.to_json()
    }
}
