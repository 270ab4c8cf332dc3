//! Hand-off of a finished table to an output encoding.

use std::{fmt, io::Write, str::FromStr};

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value as JsonValue};

use crate::{
    data::Value,
    rows::{Row, Table},
    table::render_table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Tsv,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Formats that can only show one value per column.
    pub fn is_flat(self) -> bool {
        matches!(self, OutputFormat::Table | OutputFormat::Csv | OutputFormat::Tsv)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(anyhow!("Unknown output format '{other}'")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes a finished table. Implementations make no assumption about how the table
/// was produced.
pub trait TableRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> Result<()>;
}

fn cell(row: &Row, column: &str) -> String {
    row.get(column).map(Value::as_display).unwrap_or_default()
}

fn cells(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| table.columns.iter().map(|column| cell(row, column)).collect())
        .collect()
}

/// Rows as JSON objects with keys in column order.
fn ordered_objects(table: &Table) -> Vec<JsonValue> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for column in &table.columns {
                if let Some(value) = row.get(column) {
                    object.insert(column.clone(), value.to_json());
                }
            }
            JsonValue::Object(object)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextTableRenderer;

impl TableRenderer for TextTableRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        out.write_all(render_table(table).as_bytes())
            .context("Writing table output")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DelimitedRenderer {
    pub delimiter: u8,
    pub with_headers: bool,
}

impl TableRenderer for DelimitedRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .double_quote(true)
            .from_writer(out);
        if self.with_headers {
            writer
                .write_record(&table.columns)
                .context("Writing header row")?;
        }
        for (idx, record) in cells(table).iter().enumerate() {
            writer
                .write_record(record)
                .with_context(|| format!("Writing row {}", idx + 1))?;
        }
        writer.flush().context("Flushing delimited output")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl TableRenderer for JsonRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, &ordered_objects(table))
            .context("Writing JSON output")?;
        writeln!(out).context("Writing JSON output")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRenderer;

impl TableRenderer for YamlRenderer {
    fn render(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        serde_yaml::to_writer(out, &ordered_objects(table)).context("Writing YAML output")
    }
}

pub fn renderer_for(
    format: OutputFormat,
    csv_separator: u8,
    with_headers: bool,
) -> Box<dyn TableRenderer> {
    match format {
        OutputFormat::Table => Box::new(TextTableRenderer),
        OutputFormat::Csv => Box::new(DelimitedRenderer {
            delimiter: csv_separator,
            with_headers,
        }),
        OutputFormat::Tsv => Box::new(DelimitedRenderer {
            delimiter: b'\t',
            with_headers,
        }),
        OutputFormat::Json => Box::new(JsonRenderer),
        OutputFormat::Yaml => Box::new(YamlRenderer),
    }
}
