//! Position-keyed diffs.
//!
//! A [`Diff`] records, per schema position, how a field changed between two
//! records. In memory every deleted field carries its own
//! [`DiffEntry::Delete`]. On the wire all deletions of one nesting level
//! are aggregated under the [`DELETE_SENTINEL`] key:
//!
//! ```text
//! {"0": "new value", "2": {"1": 5}, "-1": [3, 4]}
//! ```
//!
//! Decoding needs the schema to tell a nested diff from a replacement
//! value, see [`StructCodec::decode_diff`](crate::codec::StructCodec::decode_diff).

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::record::Folded;

/// Wire key collecting the positions of deleted fields.
pub const DELETE_SENTINEL: &str = "-1";

/// Change to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// Replace the whole field with this array-form value.
    Replace(Folded),
    /// Patch a nested record.
    Nested(Diff),
    /// Remove the field.
    Delete,
}

/// Sparse, position-keyed set of changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    entries: BTreeMap<usize, DiffEntry>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, position: usize) -> Option<&DiffEntry> {
        self.entries.get(&position)
    }

    pub fn insert(&mut self, position: usize, entry: DiffEntry) -> Option<DiffEntry> {
        self.entries.insert(position, entry)
    }

    pub fn remove(&mut self, position: usize) -> Option<DiffEntry> {
        self.entries.remove(&position)
    }

    /// Entries in ascending position order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &DiffEntry)> {
        self.entries.iter().map(|(pos, entry)| (*pos, entry))
    }

    /// Positions deleted at this level.
    pub fn deleted(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, DiffEntry::Delete))
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Wire encoding.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let mut deleted = Vec::new();
        for (pos, entry) in &self.entries {
            match entry {
                DiffEntry::Replace(value) => {
                    map.insert(pos.to_string(), value.to_wire_json());
                }
                DiffEntry::Nested(diff) => {
                    map.insert(pos.to_string(), diff.to_json());
                }
                DiffEntry::Delete => deleted.push(Value::from(*pos)),
            }
        }
        if !deleted.is_empty() {
            map.insert(DELETE_SENTINEL.to_string(), Value::Array(deleted));
        }
        Value::Object(map)
    }
}

impl FromIterator<(usize, DiffEntry)> for Diff {
    fn from_iter<I: IntoIterator<Item = (usize, DiffEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deletions_collapse_under_sentinel() {
        let diff: Diff = [
            (0, DiffEntry::Replace(Folded::Leaf(json!("a")))),
            (2, DiffEntry::Delete),
            (5, DiffEntry::Delete),
        ]
        .into_iter()
        .collect();

        assert_eq!(diff.deleted(), vec![2, 5]);
        assert_eq!(diff.to_json(), json!({"0": "a", "-1": [2, 5]}));
    }

    #[test]
    fn test_nested_encoding() {
        let inner: Diff = [(1, DiffEntry::Delete)].into_iter().collect();
        let diff: Diff = [(3, DiffEntry::Nested(inner))].into_iter().collect();
        assert_eq!(diff.to_json(), json!({"3": {"-1": [1]}}));
    }

    #[test]
    fn test_replaced_records_drop_trailing_absent_slots() {
        let record = Folded::Record(vec![None, Some(Folded::Leaf(json!(1))), None, None]);
        let diff: Diff = [
            (0, DiffEntry::Replace(record.clone())),
            (1, DiffEntry::Replace(Folded::List(vec![record]))),
            (2, DiffEntry::Replace(Folded::Record(vec![None, None]))),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            diff.to_json(),
            json!({"0": [null, 1], "1": [[null, 1]], "2": []})
        );
    }

    #[test]
    fn test_empty() {
        assert!(Diff::new().is_empty());
        assert_eq!(Diff::new().to_json(), json!({}));
    }
}
