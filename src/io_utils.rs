//! Input handling: format and delimiter resolution, decoding, and record readers.
//!
//! Every reader produces ordered [`Row`]s ready for ingestion by the pipeline. The
//! `-` path reads standard input. Input bytes are decoded with `encoding_rs`,
//! defaulting to UTF-8.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use serde_json::Value as JsonValue;

use crate::{data::Value, rows::Row};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    Yaml,
}

impl FromStr for InputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Ok(InputFormat::Csv),
            "json" | "jsonl" | "ndjson" => Ok(InputFormat::Json),
            "yaml" | "yml" => Ok(InputFormat::Yaml),
            other => Err(anyhow!("Unknown input format '{other}'")),
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// An explicit format wins; otherwise the extension decides, falling back to CSV.
pub fn resolve_input_format(path: &Path, provided: Option<InputFormat>) -> InputFormat {
    provided.unwrap_or_else(|| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or(InputFormat::Csv)
    })
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn read_input_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading standard input")?;
    } else {
        BufReader::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    decode_bytes(&bytes, encoding)
}

/// Numbers become numeric cells; everything else stays text.
pub fn infer_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Integer(int);
    }
    if !trimmed.is_empty() && trimmed.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(float) = trimmed.parse::<f64>() {
            if float.is_finite() {
                return Value::Float(float);
            }
        }
    }
    Value::String(raw.to_string())
}

pub fn read_csv_rows(text: &str, delimiter: u8) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("Reading CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV row {}", idx + 2))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, raw)| (header.clone(), infer_cell(raw)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn rows_from_json(value: JsonValue, source: &str) -> Result<Vec<Row>> {
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                JsonValue::Object(map) => Ok(Row::from_json_map(map)),
                other => Err(anyhow!(
                    "{source} record {} is not an object: {other}",
                    idx + 1
                )),
            })
            .collect(),
        JsonValue::Object(map) => Ok(vec![Row::from_json_map(map)]),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(anyhow!("{source} input must hold objects, got {other}")),
    }
}

/// Accepts an array of objects, a single object, or one object per line.
pub fn read_json_rows(text: &str) -> Result<Vec<Row>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<JsonValue>(text) {
        Ok(value) => rows_from_json(value, "JSON"),
        Err(whole_err) => {
            let mut rows = Vec::new();
            for (idx, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let value: JsonValue = serde_json::from_str(line).with_context(|| {
                    format!("Parsing JSON line {} (whole document: {whole_err})", idx + 1)
                })?;
                rows.extend(rows_from_json(value, "JSON line")?);
            }
            Ok(rows)
        }
    }
}

pub fn read_yaml_rows(text: &str) -> Result<Vec<Row>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: JsonValue = serde_yaml::from_str(text).context("Parsing YAML input")?;
    rows_from_json(value, "YAML")
}

pub fn read_rows(text: &str, format: InputFormat, delimiter: u8) -> Result<Vec<Row>> {
    match format {
        InputFormat::Csv => read_csv_rows(text, delimiter),
        InputFormat::Json => read_json_rows(text),
        InputFormat::Yaml => read_yaml_rows(text),
    }
}
