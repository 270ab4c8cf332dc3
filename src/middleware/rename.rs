//! Field renaming by exact name or by regular expression.
//!
//! A rename document looks like:
//!
//! ```yaml
//! renames:
//!   old_name: new_name
//! regex_renames:
//!   "^col_(.*)$": "$1"
//! ```

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::TableMiddleware;
use crate::{
    error::PipelineError,
    rows::{Row, Table},
};

const STAGE: &str = "rename";

#[derive(Debug, Clone, Default)]
pub struct RenameColumnMiddleware {
    renames: Vec<(String, String)>,
    regex_renames: Vec<(Regex, String)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenameDocument {
    #[serde(default)]
    renames: Map<String, JsonValue>,
    #[serde(default)]
    regex_renames: Map<String, JsonValue>,
}

fn as_target(stage_field: &str, value: JsonValue) -> Result<String, PipelineError> {
    match value {
        JsonValue::String(target) => Ok(target),
        other => Err(PipelineError::document(
            STAGE,
            format!("rename target for '{stage_field}' must be a string, got {other}"),
        )),
    }
}

impl RenameColumnMiddleware {
    pub fn new(renames: Vec<(String, String)>) -> Self {
        Self {
            renames,
            regex_renames: Vec::new(),
        }
    }

    pub fn with_regex_renames(
        mut self,
        regex_renames: Vec<(String, String)>,
    ) -> Result<Self, PipelineError> {
        for (pattern, replacement) in regex_renames {
            let regex = Regex::new(&pattern).map_err(|source| PipelineError::InvalidRegex {
                stage: STAGE,
                field: replacement.clone(),
                pattern: pattern.clone(),
                source,
            })?;
            self.regex_renames.push((regex, replacement));
        }
        Ok(self)
    }

    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        let document: RenameDocument = serde_yaml::from_str(text)
            .map_err(|err| PipelineError::document(STAGE, err.to_string()))?;
        let renames = document
            .renames
            .into_iter()
            .map(|(from, to)| Ok((from.clone(), as_target(&from, to)?)))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let regex_renames = document
            .regex_renames
            .into_iter()
            .map(|(from, to)| Ok((from.clone(), as_target(&from, to)?)))
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Self::new(renames).with_regex_renames(regex_renames)
    }

    /// Appends the rules of `other`; earlier rules take precedence.
    pub fn merge(mut self, other: RenameColumnMiddleware) -> Self {
        self.renames.extend(other.renames);
        self.regex_renames.extend(other.regex_renames);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.regex_renames.is_empty()
    }

    pub fn rename(&self, field: &str) -> String {
        if let Some((_, to)) = self.renames.iter().find(|(from, _)| from == field) {
            return to.clone();
        }
        for (regex, replacement) in &self.regex_renames {
            if regex.is_match(field) {
                return regex.replace_all(field, replacement.as_str()).into_owned();
            }
        }
        field.to_string()
    }

    fn rename_row(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(key, value)| (self.rename(&key), value))
            .collect()
    }
}

impl TableMiddleware for RenameColumnMiddleware {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        let mut columns: Vec<String> = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let renamed = self.rename(column);
            if !columns.contains(&renamed) {
                columns.push(renamed);
            }
        }
        let mut renamed = Table {
            columns,
            rows: table
                .rows
                .into_iter()
                .map(|row| self.rename_row(row))
                .collect(),
        };
        renamed.finalize();
        Ok(renamed)
    }
}
