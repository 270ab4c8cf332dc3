use super::{TableMiddleware, columns::preserve_column_order};
use crate::{
    error::PipelineError,
    rows::{Row, Table},
};

/// Keeps the fields named in `fields` and drops those named in `filters`.
///
/// Entries ending in `.` match by prefix. A field matched by both lists is dropped.
/// An empty `fields` list keeps everything not filtered.
#[derive(Debug, Clone, Default)]
pub struct FieldsFilterMiddleware {
    fields: Vec<String>,
    filters: Vec<String>,
}

fn matches(patterns: &[String], field: &str) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.ends_with('.') {
            field.starts_with(pattern.as_str())
        } else {
            pattern == field
        }
    })
}

impl FieldsFilterMiddleware {
    pub fn new(fields: Vec<String>, filters: Vec<String>) -> Self {
        Self { fields, filters }
    }

    pub fn keeps(&self, field: &str) -> bool {
        (self.fields.is_empty() || matches(&self.fields, field)) && !matches(&self.filters, field)
    }

    fn filter_row(&self, row: Row) -> Row {
        row.into_iter()
            .filter(|(key, _)| self.keeps(key))
            .collect()
    }
}

impl TableMiddleware for FieldsFilterMiddleware {
    fn name(&self) -> &'static str {
        "fields-filter"
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        if self.fields.is_empty() && self.filters.is_empty() {
            return Ok(table);
        }
        let declared: Vec<String> = table
            .columns
            .iter()
            .filter(|column| self.keeps(column))
            .cloned()
            .collect();
        let mut filtered = Table {
            columns: Vec::new(),
            rows: table
                .rows
                .into_iter()
                .map(|row| self.filter_row(row))
                .collect(),
        };
        filtered.columns = preserve_column_order(&declared, &filtered.row_keys());
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn row(keys: &[&str]) -> Row {
        keys.iter()
            .map(|k| (k.to_string(), Value::from(*k)))
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_named_fields_and_prefixes() {
        let table = Table::from_rows(vec![row(&["id", "addr.city", "addr.zip", "name"])]);
        let middleware = FieldsFilterMiddleware::new(strings(&["addr.", "id"]), Vec::new());
        let filtered = middleware.process(table).unwrap();
        assert_eq!(filtered.columns, strings(&["id", "addr.city", "addr.zip"]));
        assert!(filtered.rows[0].get("name").is_none());
    }

    #[test]
    fn filter_wins_over_fields() {
        let table = Table::from_rows(vec![row(&["id", "secret", "name"])]);
        let middleware =
            FieldsFilterMiddleware::new(strings(&["id", "secret"]), strings(&["secret"]));
        let filtered = middleware.process(table).unwrap();
        assert_eq!(filtered.columns, strings(&["id"]));
    }
}
