//! Ordered records and the table that accumulates them.
//!
//! A [`Row`] keeps its fields in insertion order; lookups are linear, which is fine
//! for the record widths this tool deals with. A [`Table`] pairs rows with a column
//! list that is a presentation concern and may differ from the keys of any one row.

use itertools::Itertools;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value as JsonValue};

use crate::{data::Value, middleware::columns::preserve_column_order};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|(name, _)| name == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Sets `key`, keeping its position when it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.fields[idx].1, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|idx| self.fields.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn has_nested(&self) -> bool {
        self.fields
            .iter()
            .any(|(_, value)| matches!(value, Value::Row(_)))
    }

    pub fn from_json_map(map: Map<String, JsonValue>) -> Self {
        map.into_iter()
            .map(|(key, value)| (key, Value::from_json(value)))
            .collect()
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut table = Table {
            columns: Vec::new(),
            rows,
        };
        table.finalize();
        table
    }

    /// Keys of all rows, in first-seen order.
    pub fn row_keys(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|row| row.keys())
            .unique()
            .map(|key| key.to_string())
            .collect()
    }

    /// Recomputes `columns` from the rows, keeping the current order for columns that
    /// are still present and appending new keys in first-seen order.
    pub fn finalize(&mut self) {
        let keys = self.row_keys();
        self.columns = preserve_column_order(&self.columns, &keys);
    }
}
