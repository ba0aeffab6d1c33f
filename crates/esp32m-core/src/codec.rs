//! Struct codec: map form / array form conversion and position-keyed diffs.
//!
//! The codec walks the schema, never the data, so recursion depth is the
//! schema depth. Values the schema does not describe (scalars, opaque
//! lists, unknown keys) pass through untouched or are ignored.

use serde_json::{Map, Value};

use crate::diff::{Diff, DiffEntry, DELETE_SENTINEL};
use crate::equal::deep_equal;
use crate::error::StructError;
use crate::hash::murmur3_32;
use crate::record::{slots_to_json, AsRecord, FieldState, Folded, Node, RecordRef};
use crate::schema::{Field, Schema};

/// Converts and diffs records of one schema.
#[derive(Debug, Clone)]
pub struct StructCodec {
    schema: Schema,
}

impl StructCodec {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Normalize a record to map form.
    ///
    /// Absent fields are omitted; keys not in the schema are dropped.
    pub fn unfold(&self, input: &impl AsRecord) -> Result<Map<String, Value>, StructError> {
        unfold_record(&self.schema, input.as_record()?)
    }

    /// Normalize a record to array form, one slot per schema field.
    pub fn fold(&self, input: &impl AsRecord) -> Result<Vec<Option<Folded>>, StructError> {
        fold_record(&self.schema, input.as_record()?)
    }

    /// [`fold`](Self::fold) rendered as a JSON array.
    pub fn fold_json(&self, input: &impl AsRecord) -> Result<Value, StructError> {
        Ok(slots_to_json(&self.fold(input)?))
    }

    /// Compute the changes turning `prev` into `next`.
    pub fn diff(&self, prev: &impl AsRecord, next: &impl AsRecord) -> Result<Diff, StructError> {
        diff_record(&self.schema, prev.as_record()?, next.as_record()?)
    }

    /// Apply a diff to `base`, returning the patched record in map form.
    pub fn apply_diff(
        &self,
        base: &impl AsRecord,
        diff: &Diff,
    ) -> Result<Map<String, Value>, StructError> {
        let mut map = self.unfold(base)?;
        apply_record(&self.schema, &mut map, diff)?;
        Ok(map)
    }

    /// Content hash of a record: murmur3 of its compact array-form JSON.
    pub fn hash(&self, input: &impl AsRecord) -> Result<u32, StructError> {
        let text = self.fold_json(input)?.to_string();
        Ok(murmur3_32(text.as_bytes(), 0))
    }

    /// Wire encoding of a diff.
    pub fn encode_diff(&self, diff: &Diff) -> Value {
        diff.to_json()
    }

    /// Decode a wire diff against this codec's schema.
    pub fn decode_diff(&self, value: &Value) -> Result<Diff, StructError> {
        decode_record_diff(&self.schema, value)
    }
}

fn unfold_record(schema: &Schema, record: RecordRef<'_>) -> Result<Map<String, Value>, StructError> {
    let mut map = Map::new();
    for (pos, field) in schema.fields().iter().enumerate() {
        match record.get(pos, field.key()) {
            FieldState::Absent => {}
            FieldState::Null => {
                map.insert(field.key().to_string(), Value::Null);
            }
            FieldState::Present(node) => {
                map.insert(field.key().to_string(), unfold_value(field, node)?);
            }
        }
    }
    Ok(map)
}

fn unfold_value(field: &Field, node: Node<'_>) -> Result<Value, StructError> {
    if node.is_null() {
        return Ok(Value::Null);
    }
    match field.children() {
        Some(children) if field.is_array() => node
            .items(field.key())?
            .into_iter()
            .map(|item| unfold_item(field, children, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Some(children) => Ok(Value::Object(unfold_record(
            children,
            RecordRef::of(node, field.key())?,
        )?)),
        None if field.is_array() => Ok(Value::Array(
            node.items(field.key())?.iter().map(Node::to_json).collect(),
        )),
        None => Ok(node.to_json()),
    }
}

fn unfold_item(field: &Field, children: &Schema, item: Node<'_>) -> Result<Value, StructError> {
    if item.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Object(unfold_record(
        children,
        RecordRef::of(item, field.key())?,
    )?))
}

fn fold_record(schema: &Schema, record: RecordRef<'_>) -> Result<Vec<Option<Folded>>, StructError> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(pos, field)| fold_state(field, record.get(pos, field.key())))
        .collect()
}

fn fold_state(field: &Field, state: FieldState<Node<'_>>) -> Result<Option<Folded>, StructError> {
    match state {
        FieldState::Absent => Ok(None),
        FieldState::Null => Ok(Some(Folded::Leaf(Value::Null))),
        FieldState::Present(node) => fold_value(field, node).map(Some),
    }
}

fn fold_value(field: &Field, node: Node<'_>) -> Result<Folded, StructError> {
    if node.is_null() {
        return Ok(Folded::Leaf(Value::Null));
    }
    match field.children() {
        Some(children) if field.is_array() => node
            .items(field.key())?
            .into_iter()
            .map(|item| fold_item(field, children, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Folded::List),
        Some(children) => Ok(Folded::Record(fold_record(
            children,
            RecordRef::of(node, field.key())?,
        )?)),
        None if field.is_array() => Ok(Folded::Leaf(Value::Array(
            node.items(field.key())?.iter().map(Node::to_json).collect(),
        ))),
        None => Ok(Folded::Leaf(node.to_json())),
    }
}

fn fold_item(field: &Field, children: &Schema, item: Node<'_>) -> Result<Folded, StructError> {
    if item.is_null() {
        return Ok(Folded::Leaf(Value::Null));
    }
    Ok(Folded::Record(fold_record(
        children,
        RecordRef::of(item, field.key())?,
    )?))
}

fn unfold_state(field: &Field, state: FieldState<Node<'_>>) -> Result<Value, StructError> {
    match state {
        FieldState::Present(node) => unfold_value(field, node),
        FieldState::Absent | FieldState::Null => Ok(Value::Null),
    }
}

fn diff_record(
    schema: &Schema,
    prev: RecordRef<'_>,
    next: RecordRef<'_>,
) -> Result<Diff, StructError> {
    let mut diff = Diff::new();
    for (pos, field) in schema.fields().iter().enumerate() {
        let p = prev.get(pos, field.key());
        let n = next.get(pos, field.key());
        match (p, n) {
            (FieldState::Absent, FieldState::Absent) => {}
            (_, FieldState::Absent) => {
                diff.insert(pos, DiffEntry::Delete);
            }
            (FieldState::Absent, n) => {
                if let Some(value) = fold_state(field, n)? {
                    diff.insert(pos, DiffEntry::Replace(value));
                }
            }
            (FieldState::Present(p), FieldState::Present(n)) if field.is_record() => {
                if let Some(children) = field.children() {
                    let nested = diff_record(
                        children,
                        RecordRef::of(p, field.key())?,
                        RecordRef::of(n, field.key())?,
                    )?;
                    if !nested.is_empty() {
                        diff.insert(pos, DiffEntry::Nested(nested));
                    }
                }
            }
            (p, n) => {
                // Lists are compared and replaced as a whole.
                if !deep_equal(&unfold_state(field, p)?, &unfold_state(field, n)?) {
                    if let Some(value) = fold_state(field, n)? {
                        diff.insert(pos, DiffEntry::Replace(value));
                    }
                }
            }
        }
    }
    Ok(diff)
}

fn apply_record(schema: &Schema, map: &mut Map<String, Value>, diff: &Diff) -> Result<(), StructError> {
    for (pos, entry) in diff.iter() {
        let Some(field) = schema.get(pos) else {
            continue;
        };
        match entry {
            DiffEntry::Delete => {
                map.remove(field.key());
            }
            DiffEntry::Replace(value) => {
                let value = unfold_value(field, Node::Folded(value))?;
                map.insert(field.key().to_string(), value);
            }
            DiffEntry::Nested(nested) => {
                let children = match field.children() {
                    Some(children) if !field.is_array() => children,
                    _ => {
                        return Err(StructError::SchemaMismatch {
                            field: field.key().to_string(),
                            expected: "replacement value",
                            found: "nested diff".to_string(),
                        })
                    }
                };
                let current = map
                    .entry(field.key().to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                match current {
                    Value::Object(inner) => apply_record(children, inner, nested)?,
                    other => return Err(StructError::mismatch(field.key(), "record", other)),
                }
            }
        }
    }
    Ok(())
}

fn decode_record_diff(schema: &Schema, value: &Value) -> Result<Diff, StructError> {
    let map = value
        .as_object()
        .ok_or_else(|| StructError::InvalidDiff(format!("expected object, got {value}")))?;

    let mut diff = Diff::new();
    for (key, entry) in map {
        if key == DELETE_SENTINEL {
            let positions = entry.as_array().ok_or_else(|| {
                StructError::InvalidDiff(format!("deletion list must be an array, got {entry}"))
            })?;
            for position in positions {
                let pos = position
                    .as_u64()
                    .map(|p| p as usize)
                    .filter(|p| *p < schema.len())
                    .ok_or_else(|| {
                        StructError::InvalidDiff(format!("bad deleted position {position}"))
                    })?;
                diff.insert(pos, DiffEntry::Delete);
            }
            continue;
        }

        let pos: usize = key
            .parse()
            .map_err(|_| StructError::InvalidDiff(format!("bad position key '{key}'")))?;
        let field = schema.get(pos).ok_or_else(|| {
            StructError::InvalidDiff(format!("position {pos} outside schema of {}", schema.len()))
        })?;

        let decoded = match field.children() {
            Some(children) if !field.is_array() && entry.is_object() => {
                DiffEntry::Nested(decode_record_diff(children, entry)?)
            }
            _ => DiffEntry::Replace(fold_value(field, Node::Json(entry))?),
        };
        diff.insert(pos, decoded);
    }
    Ok(diff)
}
