use std::cmp::Ordering;

use super::TableMiddleware;
use crate::{
    data::Value,
    error::PipelineError,
    rows::{Row, Table},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    /// Parses `column` or `-column` (descending).
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (column, descending) = match spec.strip_prefix('-') {
            Some(column) => (column, true),
            None => (spec.strip_prefix('+').unwrap_or(spec), false),
        };
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            descending,
        })
    }
}

/// Stable multi-key row sort. Missing values order before present ones.
#[derive(Debug, Clone, Default)]
pub struct SortByMiddleware {
    keys: Vec<SortKey>,
}

impl SortByMiddleware {
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            keys: columns
                .iter()
                .filter_map(|column| SortKey::parse(column.as_ref()))
                .collect(),
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    fn compare(&self, left: &Row, right: &Row) -> Ordering {
        for key in &self.keys {
            let ordering = match (
                left.get(&key.column).filter(|v| !v.is_null()),
                right.get(&key.column).filter(|v| !v.is_null()),
            ) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => Value::total_cmp(a, b),
            };
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl TableMiddleware for SortByMiddleware {
    fn name(&self) -> &'static str {
        "sort-by"
    }

    fn process(&self, mut table: Table) -> Result<Table, PipelineError> {
        if !self.keys.is_empty() {
            table.rows.sort_by(|a, b| self.compare(a, b));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, age: Option<i64>) -> Row {
        let mut row = Row::new();
        row.insert("name", Value::from(name));
        if let Some(age) = age {
            row.insert("age", Value::Integer(age));
        }
        row
    }

    fn names(table: &Table) -> Vec<String> {
        table
            .rows
            .iter()
            .map(|r| r.get("name").map(Value::as_display).unwrap_or_default())
            .collect()
    }

    #[test]
    fn sorts_descending_with_missing_values_first_then_stable() {
        let table = Table::from_rows(vec![
            row("a", Some(3)),
            row("b", None),
            row("c", Some(5)),
            row("d", Some(3)),
        ]);
        let sorted = SortByMiddleware::from_columns(&["age"]).process(table.clone()).unwrap();
        assert_eq!(names(&sorted), vec!["b", "a", "d", "c"]);

        let sorted = SortByMiddleware::from_columns(&["-age", "-name"]).process(table).unwrap();
        assert_eq!(names(&sorted), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn parse_rejects_empty_columns() {
        assert_eq!(SortKey::parse("-"), None);
        assert_eq!(
            SortKey::parse("+name"),
            Some(SortKey {
                column: "name".into(),
                descending: false
            })
        );
    }
}
