use super::TableMiddleware;
use crate::{error::PipelineError, rows::Table};

/// Drops the first `skip` rows, then keeps at most `limit` rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipLimitMiddleware {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl SkipLimitMiddleware {
    pub fn new(skip: usize, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }
}

impl TableMiddleware for SkipLimitMiddleware {
    fn name(&self) -> &'static str {
        "skip-limit"
    }

    fn process(&self, table: Table) -> Result<Table, PipelineError> {
        let rows = table
            .rows
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(Table {
            columns: table.columns,
            rows,
        })
    }
}
