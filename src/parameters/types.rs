//! Registry of supported parameter kinds.
//!
//! Every [`ParameterType`] maps to a static [`TypeInfo`] entry describing whether the
//! parameter collects several raw values (a list kind) and whether its raw values are
//! resolved by reading files. The table is built at compile time and never mutated.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::ParameterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterType {
    String,
    StringFromFile,
    StringFromFiles,
    File,
    FileList,
    ObjectFromFile,
    ObjectListFromFile,
    ObjectListFromFiles,
    StringListFromFile,
    StringListFromFiles,
    KeyValue,
    Integer,
    Float,
    Bool,
    Date,
    StringList,
    IntegerList,
    FloatList,
    Choice,
    ChoiceList,
}

/// How raw values of a parameter kind relate to files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLoading {
    Never,
    /// Raw values are always paths; a leading `@` is tolerated and stripped.
    Always,
    /// Raw values are literal unless they start with `@`.
    WhenPrefixed,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub ty: ParameterType,
    pub token: &'static str,
    pub list: bool,
    pub file_loading: FileLoading,
}

const fn entry(
    ty: ParameterType,
    token: &'static str,
    list: bool,
    file_loading: FileLoading,
) -> TypeInfo {
    TypeInfo {
        ty,
        token,
        list,
        file_loading,
    }
}

// Ordered by discriminant so that `ty as usize` indexes the entry.
static REGISTRY: [TypeInfo; 20] = [
    entry(ParameterType::String, "string", false, FileLoading::Never),
    entry(ParameterType::StringFromFile, "stringFromFile", false, FileLoading::Always),
    entry(ParameterType::StringFromFiles, "stringFromFiles", true, FileLoading::Always),
    entry(ParameterType::File, "file", false, FileLoading::Always),
    entry(ParameterType::FileList, "fileList", true, FileLoading::Always),
    entry(ParameterType::ObjectFromFile, "objectFromFile", false, FileLoading::Always),
    entry(ParameterType::ObjectListFromFile, "objectListFromFile", true, FileLoading::Always),
    entry(ParameterType::ObjectListFromFiles, "objectListFromFiles", true, FileLoading::Always),
    entry(ParameterType::StringListFromFile, "stringListFromFile", true, FileLoading::Always),
    entry(ParameterType::StringListFromFiles, "stringListFromFiles", true, FileLoading::Always),
    entry(ParameterType::KeyValue, "keyValue", true, FileLoading::WhenPrefixed),
    entry(ParameterType::Integer, "integer", false, FileLoading::Never),
    entry(ParameterType::Float, "float", false, FileLoading::Never),
    entry(ParameterType::Bool, "bool", false, FileLoading::Never),
    entry(ParameterType::Date, "date", false, FileLoading::Never),
    entry(ParameterType::StringList, "stringList", true, FileLoading::Never),
    entry(ParameterType::IntegerList, "integerList", true, FileLoading::Never),
    entry(ParameterType::FloatList, "floatList", true, FileLoading::Never),
    entry(ParameterType::Choice, "choice", false, FileLoading::Never),
    entry(ParameterType::ChoiceList, "choiceList", true, FileLoading::Never),
];

impl ParameterType {
    pub fn all() -> impl Iterator<Item = ParameterType> {
        REGISTRY.iter().map(|info| info.ty)
    }

    pub fn info(self) -> &'static TypeInfo {
        &REGISTRY[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.info().token
    }

    /// True when the parameter accumulates several raw values into one list value.
    pub fn is_list(self) -> bool {
        self.info().list
    }

    /// True when raw values of this kind can be resolved from disk.
    pub fn loads_files(self) -> bool {
        self.info().file_loading != FileLoading::Never
    }

    /// True when `value` must be resolved by reading a file rather than used literally.
    pub fn is_file_loading(self, value: &str) -> bool {
        match self.info().file_loading {
            FileLoading::Never => false,
            FileLoading::Always => true,
            FileLoading::WhenPrefixed => value.starts_with('@'),
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, ParameterType::Choice | ParameterType::ChoiceList)
    }
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}

impl FromStr for ParameterType {
    type Err = ParameterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(value);
        let aliased = match normalized.as_str() {
            "int" => "integer",
            "boolean" => "bool",
            "double" => "float",
            "intlist" => "integerlist",
            "keyvalues" | "map" => "keyvalue",
            other => other,
        };
        REGISTRY
            .iter()
            .find(|info| info.token.eq_ignore_ascii_case(aliased))
            .map(|info| info.ty)
            .ok_or_else(|| ParameterError::UnknownType(value.to_string()))
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ParameterType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParameterType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ParameterType::from_str(&token).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_indexed_by_discriminant() {
        for (idx, info) in REGISTRY.iter().enumerate() {
            assert_eq!(info.ty as usize, idx, "entry {} out of order", info.token);
        }
    }

    #[test]
    fn tokens_round_trip_through_from_str() {
        for ty in ParameterType::all() {
            assert_eq!(ParameterType::from_str(ty.as_str()).unwrap(), ty);
        }
        assert_eq!(
            ParameterType::from_str("key-value").unwrap(),
            ParameterType::KeyValue
        );
        assert_eq!(ParameterType::from_str("int").unwrap(), ParameterType::Integer);
        assert!(matches!(
            ParameterType::from_str("nonsense"),
            Err(ParameterError::UnknownType(_))
        ));
    }

    #[test]
    fn key_value_only_loads_prefixed_values() {
        assert!(ParameterType::KeyValue.is_file_loading("@vars.yaml"));
        assert!(!ParameterType::KeyValue.is_file_loading("a:b"));
        assert!(ParameterType::StringFromFile.is_file_loading("notes.txt"));
        assert!(!ParameterType::String.is_file_loading("@literal"));
    }
}
