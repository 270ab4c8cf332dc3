//! Parsed parameter values.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use super::{ParameterType, files::FileData, files::json_kind};
use crate::{data::parse_date_value, error::ParameterError};

/// The typed value of one parameter after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    StringList(Vec<String>),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
    KeyValue(BTreeMap<String, String>),
    Object(Map<String, JsonValue>),
    ObjectList(Vec<Map<String, JsonValue>>),
    File(FileData),
    FileList(Vec<FileData>),
}

impl ParameterValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Float(_) => "float",
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Date(_) => "date",
            ParameterValue::StringList(_) => "string list",
            ParameterValue::IntegerList(_) => "integer list",
            ParameterValue::FloatList(_) => "float list",
            ParameterValue::KeyValue(_) => "key-value map",
            ParameterValue::Object(_) => "object",
            ParameterValue::ObjectList(_) => "object list",
            ParameterValue::File(_) => "file",
            ParameterValue::FileList(_) => "file list",
        }
    }

    /// The value written for a parameter that has no default.
    pub fn zero(ty: ParameterType) -> Self {
        match ty {
            ParameterType::String
            | ParameterType::StringFromFile
            | ParameterType::StringFromFiles
            | ParameterType::Choice => ParameterValue::String(String::new()),
            ParameterType::Integer => ParameterValue::Integer(0),
            ParameterType::Float => ParameterValue::Float(0.0),
            ParameterType::Bool => ParameterValue::Bool(false),
            ParameterType::Date => ParameterValue::Date(NaiveDateTime::default()),
            ParameterType::StringList
            | ParameterType::ChoiceList
            | ParameterType::StringListFromFile
            | ParameterType::StringListFromFiles => ParameterValue::StringList(Vec::new()),
            ParameterType::IntegerList => ParameterValue::IntegerList(Vec::new()),
            ParameterType::FloatList => ParameterValue::FloatList(Vec::new()),
            ParameterType::KeyValue => ParameterValue::KeyValue(BTreeMap::new()),
            ParameterType::ObjectFromFile => ParameterValue::Object(Map::new()),
            ParameterType::ObjectListFromFile | ParameterType::ObjectListFromFiles => {
                ParameterValue::ObjectList(Vec::new())
            }
            ParameterType::File => ParameterValue::File(FileData::default()),
            ParameterType::FileList => ParameterValue::FileList(Vec::new()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(f) => Some(*f),
            ParameterValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            ParameterValue::StringList(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_key_value(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ParameterValue::KeyValue(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, JsonValue>> {
        match self {
            ParameterValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Converts a structured (YAML/JSON) value into the shape required by `ty`.
    ///
    /// Integers are accepted where floats are expected. Strings are only accepted
    /// for string-shaped kinds and dates; callers coerce other strings with
    /// `ParameterDefinition::parse_parameter` first.
    pub fn from_json(
        ty: ParameterType,
        name: &str,
        value: &JsonValue,
    ) -> Result<Self, ParameterError> {
        let mismatch = || ParameterError::InvalidValueType {
            name: name.to_string(),
            expected: ty,
            found: json_kind(value),
        };
        match ty {
            ParameterType::String
            | ParameterType::StringFromFile
            | ParameterType::StringFromFiles
            | ParameterType::Choice => value
                .as_str()
                .map(|s| ParameterValue::String(s.to_string()))
                .ok_or_else(mismatch),
            ParameterType::Integer => value
                .as_i64()
                .map(ParameterValue::Integer)
                .ok_or_else(mismatch),
            ParameterType::Float => value
                .as_f64()
                .map(ParameterValue::Float)
                .ok_or_else(mismatch),
            ParameterType::Bool => value
                .as_bool()
                .map(ParameterValue::Bool)
                .ok_or_else(mismatch),
            ParameterType::Date => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                parse_date_value(raw)
                    .map(ParameterValue::Date)
                    .map_err(|err| ParameterError::parse(name, raw, err.to_string()))
            }
            ParameterType::StringList
            | ParameterType::ChoiceList
            | ParameterType::StringListFromFile
            | ParameterType::StringListFromFiles => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_str().map(|s| s.to_string()).ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ParameterValue::StringList)
            }
            ParameterType::IntegerList => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_i64().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ParameterValue::IntegerList)
            }
            ParameterType::FloatList => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_f64().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ParameterValue::FloatList)
            }
            ParameterType::KeyValue => {
                let object = value.as_object().ok_or_else(mismatch)?;
                let mut map = BTreeMap::new();
                for (key, item) in object {
                    let rendered = match item {
                        JsonValue::String(s) => s.clone(),
                        JsonValue::Number(_) | JsonValue::Bool(_) => item.to_string(),
                        _ => return Err(mismatch()),
                    };
                    map.insert(key.clone(), rendered);
                }
                Ok(ParameterValue::KeyValue(map))
            }
            ParameterType::ObjectFromFile => value
                .as_object()
                .map(|map| ParameterValue::Object(map.clone()))
                .ok_or_else(mismatch),
            ParameterType::ObjectListFromFile | ParameterType::ObjectListFromFiles => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_object().cloned().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ParameterValue::ObjectList)
            }
            ParameterType::File => serde_json::from_value::<FileData>(value.clone())
                .map(ParameterValue::File)
                .map_err(|_| mismatch()),
            ParameterType::FileList => serde_json::from_value::<Vec<FileData>>(value.clone())
                .map(ParameterValue::FileList)
                .map_err(|_| mismatch()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            ParameterValue::String(s) => JsonValue::String(s.clone()),
            ParameterValue::Integer(i) => JsonValue::from(*i),
            ParameterValue::Float(f) => JsonValue::from(*f),
            ParameterValue::Bool(b) => JsonValue::Bool(*b),
            ParameterValue::Date(d) => {
                JsonValue::String(d.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            ParameterValue::StringList(values) => JsonValue::from(values.clone()),
            ParameterValue::IntegerList(values) => JsonValue::from(values.clone()),
            ParameterValue::FloatList(values) => JsonValue::from(values.clone()),
            ParameterValue::KeyValue(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                    .collect(),
            ),
            ParameterValue::Object(map) => JsonValue::Object(map.clone()),
            ParameterValue::ObjectList(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|map| JsonValue::Object(map.clone()))
                    .collect(),
            ),
            ParameterValue::File(file) => serde_json::to_value(file).unwrap_or_default(),
            ParameterValue::FileList(files) => serde_json::to_value(files).unwrap_or_default(),
        }
    }

    /// Short human-readable rendering used in help listings and logs.
    pub fn display(&self) -> String {
        match self {
            ParameterValue::String(s) => s.clone(),
            ParameterValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            ParameterValue::StringList(values) => values.join(","),
            ParameterValue::File(file) => file.path.display().to_string(),
            other => other.to_json().to_string(),
        }
    }
}

impl Serialize for ParameterValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for ParameterValue {
                fn from(value: $source) -> Self {
                    ParameterValue::$variant(value.into())
                }
            }
        )*
    };
}

value_from!(
    String => String,
    &str => String,
    i64 => Integer,
    i32 => Integer,
    f64 => Float,
    bool => Bool,
    NaiveDateTime => Date,
    Vec<String> => StringList,
    Vec<i64> => IntegerList,
    Vec<f64> => FloatList,
    BTreeMap<String, String> => KeyValue,
);

impl From<Vec<&str>> for ParameterValue {
    fn from(value: Vec<&str>) -> Self {
        ParameterValue::StringList(value.into_iter().map(str::to_string).collect())
    }
}
