//! Resolution of file-sourced parameter values.
//!
//! Raw values of file-loading parameters name a path, optionally written as
//! `@path`. Structured files are read as YAML, which also accepts JSON documents.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ParameterError;

/// Contents and metadata of a file handed over through a `file`/`fileList` parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub path: PathBuf,
    pub content: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

pub fn strip_at(raw: &str) -> &str {
    raw.strip_prefix('@').unwrap_or(raw)
}

pub fn read_text(name: &str, raw: &str) -> Result<String, ParameterError> {
    let path = Path::new(strip_at(raw));
    fs::read_to_string(path).map_err(|source| ParameterError::FileLoad {
        name: name.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_file_data(name: &str, raw: &str) -> Result<FileData, ParameterError> {
    let content = read_text(name, raw)?;
    let path = PathBuf::from(strip_at(raw));
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_string());
    Ok(FileData {
        size: content.len() as u64,
        path,
        content,
        extension,
    })
}

fn parse_document(name: &str, raw: &str) -> Result<JsonValue, ParameterError> {
    let text = read_text(name, raw)?;
    serde_yaml::from_str::<JsonValue>(&text)
        .map_err(|err| ParameterError::parse(name, raw, format!("invalid document: {err}")))
}

pub fn load_object(name: &str, raw: &str) -> Result<Map<String, JsonValue>, ParameterError> {
    match parse_document(name, raw)? {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Map::new()),
        other => Err(ParameterError::parse(
            name,
            raw,
            format!("expected an object, found {}", json_kind(&other)),
        )),
    }
}

/// Loads either a list of objects or a single object (as a one-element list).
pub fn load_object_list(
    name: &str,
    raw: &str,
) -> Result<Vec<Map<String, JsonValue>>, ParameterError> {
    match parse_document(name, raw)? {
        JsonValue::Object(map) => Ok(vec![map]),
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsonValue::Object(map) => Ok(map),
                other => Err(ParameterError::parse(
                    name,
                    raw,
                    format!("expected a list of objects, found {}", json_kind(&other)),
                )),
            })
            .collect(),
        other => Err(ParameterError::parse(
            name,
            raw,
            format!("expected a list of objects, found {}", json_kind(&other)),
        )),
    }
}

/// Non-empty lines of a text file, without line terminators.
pub fn load_lines(name: &str, raw: &str) -> Result<Vec<String>, ParameterError> {
    let text = read_text(name, raw)?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect())
}

/// Loads a flat string mapping (used by `keyValue` parameters given as `@file`).
pub fn load_string_map(
    name: &str,
    raw: &str,
) -> Result<Vec<(String, String)>, ParameterError> {
    let object = load_object(name, raw)?;
    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let rendered = match value {
                JsonValue::String(s) => s,
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            (key, rendered)
        })
        .collect())
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "object",
    }
}
