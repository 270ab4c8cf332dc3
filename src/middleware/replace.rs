//! Per-field replacements and row skipping.
//!
//! The document maps field names to rule lists:
//!
//! ```yaml
//! msg:
//!   skip: [DEBUG]
//!   regex_skip: ["^TRACE"]
//!   replace:
//!     - foo: bar
//!   regex_replace:
//!     - "\\s+": " "
//! ```
//!
//! For each string field, skips are tested first and drop the whole row on a match;
//! then literal replacements and regex replacements are applied in declaration
//! order, each on the result of the previous one. Non-string values pass through.

use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use super::TableMiddleware;
use crate::{
    data::Value,
    error::PipelineError,
    rows::{Row, Table},
};

const STAGE: &str = "replace";

#[derive(Debug, Clone, Default)]
struct FieldRules {
    skips: Vec<String>,
    regex_skips: Vec<Regex>,
    replacements: Vec<(String, String)>,
    regex_replacements: Vec<(Regex, String)>,
}

impl FieldRules {
    fn skips(&self, value: &str) -> bool {
        self.skips.iter().any(|pattern| value.contains(pattern.as_str()))
            || self.regex_skips.iter().any(|regex| regex.is_match(value))
    }

    fn apply(&self, value: &str) -> String {
        let mut current = value.to_string();
        for (pattern, replacement) in &self.replacements {
            current = current.replace(pattern.as_str(), replacement);
        }
        for (regex, replacement) in &self.regex_replacements {
            current = regex.replace_all(&current, replacement.as_str()).into_owned();
        }
        current
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplaceMiddleware {
    rules: HashMap<String, FieldRules>,
}

fn compile(field: &str, pattern: &str) -> Result<Regex, PipelineError> {
    Regex::new(pattern).map_err(|source| PipelineError::InvalidRegex {
        stage: STAGE,
        field: field.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn invalid(field: &str, key: &str, value: &JsonValue) -> PipelineError {
    PipelineError::document(
        STAGE,
        format!("invalid value {value} for {key} in field {field}"),
    )
}

fn pattern_list(field: &str, key: &str, value: &JsonValue) -> Result<Vec<String>, PipelineError> {
    let items = value.as_array().ok_or_else(|| invalid(field, key, value))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(field, key, item))
        })
        .collect()
}

/// Each entry must be a mapping with exactly one `pattern: replacement` pair.
fn replacement_list(
    field: &str,
    key: &str,
    value: &JsonValue,
) -> Result<Vec<(String, String)>, PipelineError> {
    let items = value.as_array().ok_or_else(|| invalid(field, key, value))?;
    items
        .iter()
        .map(|item| {
            let entry = item
                .as_object()
                .filter(|entry| entry.len() == 1)
                .ok_or_else(|| invalid(field, key, item))?;
            let (pattern, replacement) = entry
                .iter()
                .next()
                .ok_or_else(|| invalid(field, key, item))?;
            let replacement = replacement
                .as_str()
                .ok_or_else(|| invalid(field, key, replacement))?;
            Ok((pattern.clone(), replacement.to_string()))
        })
        .collect()
}

impl ReplaceMiddleware {
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        let document: JsonValue = serde_yaml::from_str(text)
            .map_err(|err| PipelineError::document(STAGE, err.to_string()))?;
        match document {
            JsonValue::Object(map) => Self::from_map(&map),
            JsonValue::Null => Ok(Self::default()),
            _ => Err(PipelineError::document(STAGE, "invalid format")),
        }
    }

    pub fn from_map(document: &Map<String, JsonValue>) -> Result<Self, PipelineError> {
        let mut rules = HashMap::new();
        for (field, value) in document {
            let entries = value
                .as_object()
                .ok_or_else(|| PipelineError::document(STAGE, "invalid format"))?;
            let mut field_rules = FieldRules::default();
            for (key, value) in entries {
                match key.as_str() {
                    "skip" => field_rules.skips = pattern_list(field, key, value)?,
                    "regex_skip" => {
                        field_rules.regex_skips = pattern_list(field, key, value)?
                            .iter()
                            .map(|pattern| compile(field, pattern))
                            .collect::<Result<_, _>>()?
                    }
                    "replace" => field_rules.replacements = replacement_list(field, key, value)?,
                    "regex_replace" => {
                        field_rules.regex_replacements = replacement_list(field, key, value)?
                            .into_iter()
                            .map(|(pattern, replacement)| {
                                Ok((compile(field, &pattern)?, replacement))
                            })
                            .collect::<Result<_, PipelineError>>()?
                    }
                    other => {
                        return Err(PipelineError::document(
                            STAGE,
                            format!("unknown rule '{other}' in field {field}"),
                        ));
                    }
                }
            }
            rules.insert(field.clone(), field_rules);
        }
        Ok(Self { rules })
    }

    /// Returns `None` when the row must be dropped.
    pub fn process_row(&self, row: Row) -> Option<Row> {
        let mut processed = Row::with_capacity(row.len());
        for (key, value) in row {
            let value = match (self.rules.get(&key), value) {
                (Some(rules), Value::String(s)) => {
                    if rules.skips(&s) {
                        return None;
                    }
                    Value::String(rules.apply(&s))
                }
                (_, value) => value,
            };
            processed.insert(key, value);
        }
        Some(processed)
    }
}

impl TableMiddleware for ReplaceMiddleware {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        let mut processed = Table {
            columns: table.columns,
            rows: table
                .rows
                .into_iter()
                .filter_map(|row| self.process_row(row))
                .collect(),
        };
        processed.finalize();
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> Row {
        [("msg".to_string(), Value::from(text))].into_iter().collect()
    }

    #[test]
    fn skip_drops_whole_row_and_replacements_chain() {
        let middleware = ReplaceMiddleware::from_yaml(
            "msg:\n  skip: [DEBUG]\n  replace:\n    - foo: bar\n    - bar: baz\n",
        )
        .unwrap();
        let table = Table::from_rows(vec![msg("foo info"), msg("DEBUG noise")]);
        let processed = middleware.process(table).unwrap();
        assert_eq!(processed.rows, vec![msg("baz info")]);
    }

    #[test]
    fn regex_rules_apply_after_literal_ones() {
        let middleware = ReplaceMiddleware::from_yaml(
            "msg:\n  regex_skip: [\"^TRACE\"]\n  replace:\n    - \"a\": \"b\"\n  regex_replace:\n    - \"b+\": \"c\"\n",
        )
        .unwrap();
        assert_eq!(middleware.process_row(msg("aab")), Some(msg("c")));
        assert_eq!(middleware.process_row(msg("TRACE a")), None);
    }

    #[test]
    fn non_string_values_pass_through() {
        let middleware = ReplaceMiddleware::from_yaml("n:\n  skip: [\"1\"]\n").unwrap();
        let row: Row = [("n".to_string(), Value::Integer(1))].into_iter().collect();
        assert_eq!(middleware.process_row(row.clone()), Some(row));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            ReplaceMiddleware::from_yaml("msg:\n  replace: [{a: b, c: d}]\n"),
            Err(PipelineError::InvalidDocument { .. })
        ));
        assert!(matches!(
            ReplaceMiddleware::from_yaml("msg:\n  regex_skipp: [\"x\"]\n"),
            Err(PipelineError::InvalidDocument { .. })
        ));
        assert!(matches!(
            ReplaceMiddleware::from_yaml("msg:\n  regex_skip: [\"(\"]\n"),
            Err(PipelineError::InvalidRegex { .. })
        ));
    }
}
