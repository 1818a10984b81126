//! Everything a stage needs: configuration, project root, store and blob store

use crate::blob::BlobStore;
use crate::error::{StageError, StageResult};
use bn_check::{Check, CheckRunner, CheckSummary};
use bn_core::{Config, TableName, Transform};
use bn_db::{Database, TableInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Explicit per-run context handed to every stage
#[derive(Clone)]
pub struct StageContext {
    pub config: Config,
    pub root: PathBuf,
    pub db: Arc<dyn Database>,
    pub blob: Arc<dyn BlobStore>,
}

impl StageContext {
    pub fn new(
        config: Config,
        root: impl Into<PathBuf>,
        db: Arc<dyn Database>,
        blob: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            root: root.into(),
            db,
            blob,
        }
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.config.inputs_dir(&self.root)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.config.outputs_dir(&self.root)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config.logs_dir(&self.root)
    }

    pub fn input_path(&self, file: &str) -> PathBuf {
        self.inputs_dir().join(file)
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.outputs_dir().join(file)
    }

    pub fn bucket(&self) -> &str {
        &self.config.blob_store.bucket
    }

    /// Materialize a table and log its size
    pub async fn create(&self, name: &TableName, transform: &Transform) -> StageResult<TableInfo> {
        let info = self.db.create_table(name, transform).await?;
        log::info!("table={} rows={}", info.name, info.rows);
        Ok(info)
    }

    /// Export a table to `<outputs>/<table>.csv`
    pub async fn export(&self, name: &TableName) -> StageResult<PathBuf> {
        let path = self.output_path(&name.csv_file_name());
        self.db.export_csv(name, &path).await?;
        log::info!("exported {} to {}", name, path.display());
        Ok(path)
    }

    /// Fail with `MissingInput` unless every table exists
    pub async fn require_tables(&self, stage: &str, tables: &[TableName]) -> StageResult<()> {
        for table in tables {
            if !self.db.relation_exists(table).await? {
                return Err(StageError::missing(stage, format!("table {}", table)));
            }
        }
        Ok(())
    }

    /// Fail with `MissingInput` unless the file exists
    pub fn require_file(&self, stage: &str, path: &Path) -> StageResult<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(StageError::missing(stage, format!("file {}", path.display())))
        }
    }

    /// Run a stage's post-conditions; any failure fails the stage
    pub async fn verify(&self, stage: &str, checks: &[Check]) -> StageResult<CheckSummary> {
        let (_, summary) = CheckRunner::new(self.db.as_ref()).run_all(checks).await;
        if summary.all_passed() {
            log::info!("stage={} checks={} all passed", stage, summary.total);
            Ok(summary)
        } else {
            log::error!("stage={} checks failed: {}", stage, summary);
            Err(StageError::CheckFailed {
                stage: stage.to_string(),
                summary,
            })
        }
    }
}
