//! bn-db - Tabular store for Bottleneck
//!
//! This crate provides the `Database` trait, the compiler turning
//! declarative transforms into DuckDB SQL, and the DuckDB backend.

pub mod duckdb;
pub mod error;
pub mod sql;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, TableInfo};
