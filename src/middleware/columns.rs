//! Column ordering stages. These only touch `Table::columns`.

use std::collections::HashSet;

use super::TableMiddleware;
use crate::{error::PipelineError, rows::Table};

/// Keeps `old` order for columns still present in `new`, then appends the remaining
/// `new` columns in their order.
pub fn preserve_column_order(old: &[String], new: &[String]) -> Vec<String> {
    let present: HashSet<&str> = new.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(new.len());
    let mut columns = Vec::with_capacity(new.len());
    for column in old {
        if present.contains(column.as_str()) && seen.insert(column.as_str()) {
            columns.push(column.clone());
        }
    }
    for column in new {
        if seen.insert(column.as_str()) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Orders `existing` by `order`. Entries ending in `.` pull in every existing column
/// with that prefix, in existing order. Columns not mentioned keep their relative
/// order at the end; names absent from `existing` are ignored.
pub fn reorder_columns(existing: &[String], order: &[String]) -> Vec<String> {
    let known: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(existing.len());
    let mut columns = Vec::with_capacity(existing.len());
    for entry in order {
        if entry.ends_with('.') {
            for column in existing {
                if column.starts_with(entry.as_str()) && seen.insert(column.as_str()) {
                    columns.push(column.clone());
                }
            }
        } else if known.contains(entry.as_str()) && seen.insert(entry.as_str()) {
            columns.push(entry.clone());
        }
    }
    for column in existing {
        if seen.insert(column.as_str()) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Restricts the table columns to a given set, keeping the table's order.
#[derive(Debug, Clone)]
pub struct PreserveColumnOrderMiddleware {
    columns: Vec<String>,
}

impl PreserveColumnOrderMiddleware {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl TableMiddleware for PreserveColumnOrderMiddleware {
    fn name(&self) -> &'static str {
        "preserve-column-order"
    }

    fn process(&self, mut table: Table) -> Result<Table, PipelineError> {
        table.columns = preserve_column_order(&table.columns, &self.columns);
        Ok(table)
    }
}

#[derive(Debug, Clone)]
pub struct ReorderColumnOrderMiddleware {
    columns: Vec<String>,
}

impl ReorderColumnOrderMiddleware {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl TableMiddleware for ReorderColumnOrderMiddleware {
    fn name(&self) -> &'static str {
        "reorder-columns"
    }

    fn process(&self, mut table: Table) -> Result<Table, PipelineError> {
        table.columns = reorder_columns(&table.columns, &self.columns);
        Ok(table)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SortColumnsMiddleware;

impl TableMiddleware for SortColumnsMiddleware {
    fn name(&self) -> &'static str {
        "sort-columns"
    }

    fn process(&self, mut table: Table) -> Result<Table, PipelineError> {
        table.columns.sort();
        Ok(table)
    }
}
