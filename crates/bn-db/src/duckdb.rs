//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql;
use crate::traits::{Database, TableInfo};
use async_trait::async_trait;
use bn_core::{ScalarQuery, TableName, Transform};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const IN_MEMORY: &str = ":memory:";

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path, creating parent
    /// directories as needed
    pub fn from_path(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::ConnectionError(format!("{}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        log::debug!("Opened DuckDB database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == IN_MEMORY {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, []).map_err(|e| with_sql(e, sql))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn count_rows_sync(&self, name: &TableName) -> DbResult<u64> {
        let sql = sql::cast_scalar(&sql::scalar(&ScalarQuery::count(name)), "BIGINT");
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| with_sql(e, &sql))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn create_table_sync(&self, name: &TableName, transform: &Transform) -> DbResult<TableInfo> {
        transform.validate()?;
        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS {}",
            sql::quote_qualified(name),
            sql::select(transform)
        );
        log::debug!("Creating table {}: {}", name, sql);
        self.execute_sync(&sql)?;
        let rows = self.count_rows_sync(name)?;
        Ok(TableInfo {
            name: name.clone(),
            rows,
        })
    }

    fn load_csv_sync(&self, name: &TableName, path: &Path) -> DbResult<TableInfo> {
        if !path.is_file() {
            return Err(DbError::CsvNotFound(path.display().to_string()));
        }
        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto('{}')",
            sql::quote_qualified(name),
            sql::escape_sql_string(&path.display().to_string())
        );
        self.execute_sync(&sql)
            .map_err(|e| DbError::CsvError(format!("{}: {}", path.display(), e)))?;
        let rows = self.count_rows_sync(name)?;
        Ok(TableInfo {
            name: name.clone(),
            rows,
        })
    }

    fn export_csv_sync(&self, name: &TableName, path: &Path) -> DbResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::CsvError(format!("{}: {}", parent.display(), e)))?;
        }
        let sql = format!(
            "COPY (SELECT * FROM {}) TO '{}' (HEADER, DELIMITER ',')",
            sql::quote_qualified(name),
            sql::escape_sql_string(&path.display().to_string())
        );
        self.execute_sync(&sql).map_err(|e| match e {
            DbError::TableNotFound(_) => e,
            other => DbError::CsvError(format!("{}: {}", path.display(), other)),
        })?;
        Ok(())
    }

    fn scalar_sync<T: duckdb::types::FromSql>(
        &self,
        query: &ScalarQuery,
        sql_type: &str,
    ) -> DbResult<Option<T>> {
        query.validate()?;
        let sql = sql::cast_scalar(&sql::scalar(query), sql_type);
        let conn = self.lock()?;
        conn.query_row(&sql, [], |row| row.get::<_, Option<T>>(0))
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => DbError::EmptyResult(sql.clone()),
                other => with_sql(other, &sql),
            })
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &TableName) -> DbResult<bool> {
        let (schema, table) = split_name(name);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                [schema, table],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(count > 0)
    }

    fn column_names_sync(&self, name: &TableName) -> DbResult<Vec<String>> {
        let (schema, table) = split_name(name);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([schema, table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        Ok(columns)
    }
}

/// Split a possibly qualified name into (schema, table), defaulting to `main`
fn split_name(name: &TableName) -> (&str, &str) {
    match name.as_str().rsplit_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("main", name.as_str()),
    }
}

/// Classify a DuckDB error and attach the failing statement
fn with_sql(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{}: {}", msg, sql)),
        other => other,
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn create_table(&self, name: &TableName, transform: &Transform) -> DbResult<TableInfo> {
        self.create_table_sync(name, transform)
    }

    async fn load_csv(&self, name: &TableName, path: &Path) -> DbResult<TableInfo> {
        self.load_csv_sync(name, path)
    }

    async fn export_csv(&self, name: &TableName, path: &Path) -> DbResult<()> {
        self.export_csv_sync(name, path)
    }

    async fn scalar_i64(&self, query: &ScalarQuery) -> DbResult<i64> {
        self.scalar_sync::<i64>(query, "BIGINT")?
            .ok_or_else(|| DbError::EmptyResult(format!("{:?} evaluated to NULL", query)))
    }

    async fn scalar_f64(&self, query: &ScalarQuery) -> DbResult<Option<f64>> {
        self.scalar_sync::<f64>(query, "DOUBLE")
    }

    async fn relation_exists(&self, name: &TableName) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn column_names(&self, name: &TableName) -> DbResult<Vec<String>> {
        self.column_names_sync(name)
    }

    async fn checkpoint(&self) -> DbResult<()> {
        self.execute_batch_sync("CHECKPOINT")
    }

    async fn row_count(&self, name: &TableName) -> DbResult<u64> {
        self.count_rows_sync(name)
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
