//! Record transformation stages and the processor that chains them.
//!
//! Object middlewares run on every record as it is ingested and may replace it with
//! any number of records. Table middlewares run once, in order, over the finished
//! table after ingestion ends. Every stage returns a new value instead of sharing
//! state with the caller.

pub mod columns;
pub mod fields;
pub mod flatten;
pub mod rename;
pub mod replace;
pub mod skip_limit;
pub mod sort;
pub mod template;

use std::fmt;

use log::debug;

use crate::{
    error::PipelineError,
    rows::{Row, Table},
};

pub use columns::{
    PreserveColumnOrderMiddleware, ReorderColumnOrderMiddleware, SortColumnsMiddleware,
    preserve_column_order, reorder_columns,
};
pub use fields::FieldsFilterMiddleware;
pub use flatten::{FlattenObjectMiddleware, flatten_row};
pub use rename::RenameColumnMiddleware;
pub use replace::ReplaceMiddleware;
pub use skip_limit::SkipLimitMiddleware;
pub use sort::SortByMiddleware;
pub use template::{ObjectTemplateMiddleware, RowTemplateMiddleware, TemplateRenderer};

pub trait TableMiddleware: fmt::Debug {
    fn name(&self) -> &'static str;

    fn process(&self, table: Table) -> Result<Table, PipelineError>;
}

pub trait ObjectMiddleware: fmt::Debug {
    fn name(&self) -> &'static str;

    fn process(&self, object: Row) -> Result<Vec<Row>, PipelineError>;
}

#[derive(Debug, Default)]
pub struct TableProcessor {
    object_middlewares: Vec<Box<dyn ObjectMiddleware>>,
    table_middlewares: Vec<Box<dyn TableMiddleware>>,
    table: Table,
}

impl TableProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object_middleware(&mut self, middleware: Box<dyn ObjectMiddleware>) {
        debug!("Adding object middleware '{}'", middleware.name());
        self.object_middlewares.push(middleware);
    }

    pub fn add_table_middleware(&mut self, middleware: Box<dyn TableMiddleware>) {
        debug!("Adding table middleware '{}'", middleware.name());
        self.table_middlewares.push(middleware);
    }

    pub fn add_table_middleware_in_front(&mut self, middleware: Box<dyn TableMiddleware>) {
        debug!("Adding table middleware '{}' in front", middleware.name());
        self.table_middlewares.insert(0, middleware);
    }

    pub fn table_middleware_names(&self) -> Vec<&'static str> {
        self.table_middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn object_middleware_names(&self) -> Vec<&'static str> {
        self.object_middlewares.iter().map(|m| m.name()).collect()
    }

    /// Runs the object middlewares over one record and stores every result.
    pub fn process_input_object(&mut self, object: Row) -> Result<(), PipelineError> {
        let mut current = vec![object];
        for middleware in &self.object_middlewares {
            let mut next = Vec::with_capacity(current.len());
            for object in current {
                next.extend(middleware.process(object)?);
            }
            current = next;
        }
        self.table.rows.extend(current);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }

    /// Ends ingestion: finalizes the table and runs every table middleware in order.
    pub fn finish(self) -> Result<Table, PipelineError> {
        let mut table = self.table;
        table.finalize();
        for middleware in &self.table_middlewares {
            debug!(
                "Running '{}' over {} row(s)",
                middleware.name(),
                table.rows.len()
            );
            table = middleware.process(table)?;
        }
        Ok(table)
    }
}
