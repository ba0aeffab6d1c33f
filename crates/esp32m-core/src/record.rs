//! Record representations.
//!
//! A record conforming to a [`Schema`](crate::schema::Schema) exists in two
//! forms:
//!
//! - **map form**: a JSON object keyed by field name;
//! - **array form**: one slot per schema position.
//!
//! Array form received as JSON cannot mark a field as absent except by
//! ending the array early, so the codec produces array form as a
//! [`Folded`] tree where absent slots are explicit `None`s. Rendering that
//! tree back to JSON writes `null` into absent slots, the same thing the
//! device sees on the wire.

use serde_json::{Map, Value};

use crate::error::StructError;

/// Label used in errors raised for the top-level record.
pub(crate) const ROOT: &str = "<root>";

/// Array-form value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Folded {
    /// A value the schema does not describe further: scalars, null and
    /// opaque scalar lists.
    Leaf(Value),
    /// A nested record; `None` marks an absent field.
    Record(Vec<Option<Folded>>),
    /// A list of nested records.
    List(Vec<Folded>),
}

impl Folded {
    /// Render as JSON. Absent slots become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Folded::Leaf(v) => v.clone(),
            Folded::Record(slots) => slots_to_json(slots),
            Folded::List(items) => Value::Array(items.iter().map(Folded::to_json).collect()),
        }
    }

    /// Render for a diff payload: nested records drop trailing absent slots.
    pub fn to_wire_json(&self) -> Value {
        match self {
            Folded::Leaf(v) => v.clone(),
            Folded::Record(slots) => slots_to_wire_json(slots),
            Folded::List(items) => Value::Array(items.iter().map(Folded::to_wire_json).collect()),
        }
    }
}

/// Render a folded record as a JSON array.
pub fn slots_to_json(slots: &[Option<Folded>]) -> Value {
    Value::Array(
        slots
            .iter()
            .map(|slot| slot.as_ref().map_or(Value::Null, Folded::to_json))
            .collect(),
    )
}

/// Render a folded record as a sparse-tail JSON array.
///
/// Trailing absent slots are dropped, so they read back as absent. Absent
/// slots before the last present one still render as `null`.
pub fn slots_to_wire_json(slots: &[Option<Folded>]) -> Value {
    let len = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    Value::Array(
        slots[..len]
            .iter()
            .map(|slot| slot.as_ref().map_or(Value::Null, Folded::to_wire_json))
            .collect(),
    )
}

/// State of one field within one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldState<T> {
    /// The record does not carry the field at all.
    Absent,
    /// The field is present and explicitly null.
    Null,
    /// The field is present with a value.
    Present(T),
}

impl<T> FieldState<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldState::Absent)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldState<U> {
        match self {
            FieldState::Absent => FieldState::Absent,
            FieldState::Null => FieldState::Null,
            FieldState::Present(v) => FieldState::Present(f(v)),
        }
    }
}

/// A record in either representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordForm {
    /// Map form.
    Named(Map<String, Value>),
    /// Array form.
    Positional(Vec<Option<Folded>>),
}

impl RecordForm {
    /// Classify a JSON value. Objects are map form; arrays are array form
    /// with every element present.
    pub fn from_json(value: Value) -> Result<Self, StructError> {
        match value {
            Value::Object(map) => Ok(RecordForm::Named(map)),
            Value::Array(items) => Ok(RecordForm::Positional(
                items.into_iter().map(|v| Some(Folded::Leaf(v))).collect(),
            )),
            other => Err(StructError::mismatch(ROOT, "record", &other)),
        }
    }

    /// Read one field, addressed by position (array form) or key (map form).
    pub fn field(&self, position: usize, key: &str) -> FieldState<Value> {
        RecordRef::from(self).get(position, key).map(|node| node.to_json())
    }

    pub fn is_named(&self) -> bool {
        matches!(self, RecordForm::Named(_))
    }
}

impl TryFrom<Value> for RecordForm {
    type Error = StructError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        RecordForm::from_json(value)
    }
}

impl From<Map<String, Value>> for RecordForm {
    fn from(map: Map<String, Value>) -> Self {
        RecordForm::Named(map)
    }
}

impl From<Vec<Option<Folded>>> for RecordForm {
    fn from(slots: Vec<Option<Folded>>) -> Self {
        RecordForm::Positional(slots)
    }
}

/// Anything the codec can read as a record.
pub trait AsRecord {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError>;
}

impl AsRecord for RecordForm {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError> {
        Ok(RecordRef::from(self))
    }
}

impl AsRecord for Value {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError> {
        RecordRef::of(Node::Json(self), ROOT)
    }
}

impl AsRecord for Map<String, Value> {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError> {
        Ok(RecordRef(View::Named(self)))
    }
}

impl AsRecord for Vec<Option<Folded>> {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError> {
        Ok(RecordRef(View::Folded(self)))
    }
}

impl<T: AsRecord + ?Sized> AsRecord for &T {
    fn as_record(&self) -> Result<RecordRef<'_>, StructError> {
        (**self).as_record()
    }
}

/// Borrowed value at some point of a record tree.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Node<'a> {
    Json(&'a Value),
    Folded(&'a Folded),
}

impl<'a> Node<'a> {
    pub(crate) fn is_null(&self) -> bool {
        matches!(
            self,
            Node::Json(Value::Null) | Node::Folded(Folded::Leaf(Value::Null))
        )
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Node::Json(v) => (*v).clone(),
            Node::Folded(f) => f.to_json(),
        }
    }

    /// Items of a list-valued field.
    pub(crate) fn items(&self, field: &str) -> Result<Vec<Node<'a>>, StructError> {
        match *self {
            Node::Json(Value::Array(items)) | Node::Folded(Folded::Leaf(Value::Array(items))) => {
                Ok(items.iter().map(Node::Json).collect())
            }
            Node::Folded(Folded::List(items)) => Ok(items.iter().map(Node::Folded).collect()),
            other => Err(StructError::mismatch(field, "array", &other.to_json())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum View<'a> {
    Named(&'a Map<String, Value>),
    Json(&'a [Value]),
    Folded(&'a [Option<Folded>]),
}

/// Borrowed record in either form.
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a>(View<'a>);

impl<'a> RecordRef<'a> {
    /// Interpret a node as a nested record.
    pub(crate) fn of(node: Node<'a>, field: &str) -> Result<Self, StructError> {
        match node {
            Node::Json(Value::Object(map)) | Node::Folded(Folded::Leaf(Value::Object(map))) => {
                Ok(RecordRef(View::Named(map)))
            }
            Node::Json(Value::Array(items)) | Node::Folded(Folded::Leaf(Value::Array(items))) => {
                Ok(RecordRef(View::Json(items)))
            }
            Node::Folded(Folded::Record(slots)) => Ok(RecordRef(View::Folded(slots))),
            other => Err(StructError::mismatch(field, "record", &other.to_json())),
        }
    }

    pub(crate) fn get(&self, position: usize, key: &str) -> FieldState<Node<'a>> {
        let node = match self.0 {
            View::Named(map) => map.get(key).map(Node::Json),
            View::Json(items) => items.get(position).map(Node::Json),
            View::Folded(slots) => slots.get(position).and_then(Option::as_ref).map(Node::Folded),
        };
        match node {
            None => FieldState::Absent,
            Some(node) if node.is_null() => FieldState::Null,
            Some(node) => FieldState::Present(node),
        }
    }
}

impl<'a> From<&'a RecordForm> for RecordRef<'a> {
    fn from(form: &'a RecordForm) -> Self {
        match form {
            RecordForm::Named(map) => RecordRef(View::Named(map)),
            RecordForm::Positional(slots) => RecordRef(View::Folded(slots)),
        }
    }
}
