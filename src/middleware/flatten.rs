use super::{TableMiddleware, columns::preserve_column_order};
use crate::{
    data::Value,
    error::PipelineError,
    rows::{Row, Table},
};

/// Rewrites nested rows into `parent.child` fields, recursively.
pub fn flatten_row(row: Row) -> Row {
    let mut flat = Row::with_capacity(row.len());
    flatten_into(&mut flat, None, row);
    flat
}

fn flatten_into(target: &mut Row, prefix: Option<&str>, row: Row) {
    for (key, value) in row {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Row(nested) => flatten_into(target, Some(&key), nested),
            other => {
                target.insert(key, other);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenObjectMiddleware;

impl TableMiddleware for FlattenObjectMiddleware {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        let rows: Vec<Row> = table.rows.into_iter().map(flatten_row).collect();
        let mut flattened = Table {
            columns: Vec::new(),
            rows,
        };
        let keys = flattened.row_keys();
        flattened.columns = preserve_column_order(&table.columns, &keys);
        Ok(flattened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_rows_with_dotted_keys() {
        let row = Row::from_json_map(
            json!({"name": "a", "address": {"city": "x", "geo": {"lat": 1}}, "age": 3})
                .as_object()
                .unwrap()
                .clone(),
        );
        let flat = flatten_row(row);
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["name", "address.city", "address.geo.lat", "age"]
        );
    }

    #[test]
    fn table_columns_keep_prior_order() {
        let row = Row::from_json_map(
            json!({"b": 1, "nested": {"x": 2}}).as_object().unwrap().clone(),
        );
        let table = Table {
            columns: vec!["nested".into(), "b".into()],
            rows: vec![row],
        };
        let flat = FlattenObjectMiddleware.process(table).unwrap();
        assert_eq!(flat.columns, vec!["b", "nested.x"]);
    }
}
