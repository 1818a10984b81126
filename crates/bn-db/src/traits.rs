//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use bn_core::{ScalarQuery, TableName, Transform};
use std::path::Path;

/// A table materialized by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: TableName,
    pub rows: u64,
}

/// Tabular store abstraction for Bottleneck
///
/// Every table-producing operation replaces any existing table of the same
/// name, so re-running a stage overwrites its previous output.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Materialize `transform` as table `name`
    async fn create_table(&self, name: &TableName, transform: &Transform) -> DbResult<TableInfo>;

    /// Load a CSV file with type inference into table `name`
    async fn load_csv(&self, name: &TableName, path: &Path) -> DbResult<TableInfo>;

    /// Write table `name` to `path` as CSV with a header row
    async fn export_csv(&self, name: &TableName, path: &Path) -> DbResult<()>;

    /// Evaluate a scalar query as an integer
    async fn scalar_i64(&self, query: &ScalarQuery) -> DbResult<i64>;

    /// Evaluate a scalar query as a float; `None` when the result is NULL
    async fn scalar_f64(&self, query: &ScalarQuery) -> DbResult<Option<f64>>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &TableName) -> DbResult<bool>;

    /// Column names of a table, in declaration order
    async fn column_names(&self, name: &TableName) -> DbResult<Vec<String>>;

    /// Flush pending writes to the database file
    async fn checkpoint(&self) -> DbResult<()>;

    /// Number of rows in a table
    async fn row_count(&self, name: &TableName) -> DbResult<u64> {
        let n = self.scalar_i64(&ScalarQuery::count(name)).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
