//! Rows and key tuples.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::value::Value;

/// An unordered mapping from column name to [`Value`], the transport unit
/// of every stream. Rows are value types: operators receive ownership of
/// their input row and build fresh rows for their output.
///
/// The BTreeMap backing keeps iteration, comparison and serialized output
/// deterministic; column insertion order is not observable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.remove(column)
    }

    /// Iterate `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    /// Column access that surfaces a missing column as a domain error
    /// carrying the whole row for context.
    pub fn require(&self, column: &str) -> Result<&Value, FlowError> {
        self.columns
            .get(column)
            .ok_or_else(|| FlowError::missing_column(column, self))
    }

    /// The key tuple for a list of column names; missing columns contribute
    /// a null component.
    pub fn key(&self, keys: &[String]) -> KeyTuple {
        KeyTuple(
            keys.iter()
                .map(|k| self.columns.get(k).cloned().unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Rough in-memory footprint, used to budget sort spill chunks.
    pub(crate) fn approx_bytes(&self) -> usize {
        32 + self
            .columns
            .iter()
            .map(|(name, value)| 24 + name.len() + value.approx_bytes())
            .sum::<usize>()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self.columns),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<serde_json::Value> for Row {
    type Error = FlowError;

    fn try_from(v: serde_json::Value) -> Result<Self, FlowError> {
        match Value::from(v) {
            Value::Row(row) => Ok(row),
            other => Err(FlowError::Parse {
                path: "<inline>".into(),
                line: 0,
                message: format!("expected a JSON object, found {}", other.kind()),
            }),
        }
    }
}

/// The projection of a row onto an ordered list of key columns.
///
/// Ordering and equality both come from [`Value::total_cmp`], so run
/// grouping in Reduce/Join agrees exactly with the order Sort establishes.
#[derive(Clone, Debug)]
pub struct KeyTuple(Vec<Value>);

impl KeyTuple {
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl PartialEq for KeyTuple {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyTuple {}

impl PartialOrd for KeyTuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyTuple {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: serde_json::Value) -> Row {
        Row::try_from(v).unwrap()
    }

    #[test]
    fn key_tuple_nulls_for_missing_columns() {
        let r = row(json!({"a": 1}));
        let key = r.key(&["a".into(), "b".into()]);
        assert_eq!(key.values(), &[Value::Int(1), Value::Null]);
    }

    #[test]
    fn key_tuples_compare_lexicographically() {
        let a = row(json!({"x": 1, "y": "b"})).key(&["x".into(), "y".into()]);
        let b = row(json!({"x": 1, "y": "c"})).key(&["x".into(), "y".into()]);
        assert!(a < b);
    }

    #[test]
    fn key_equality_spans_int_and_float() {
        let a = row(json!({"k": 2})).key(&["k".into()]);
        let b = row(json!({"k": 2.0})).key(&["k".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn rows_serialize_as_objects() {
        let r = row(json!({"text": "hi", "n": 3}));
        assert_eq!(r.to_string(), r#"{"n":3,"text":"hi"}"#);
    }
}
