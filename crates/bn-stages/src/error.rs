//! Error types for bn-stages

use crate::blob::BlobError;
use bn_check::CheckSummary;
use bn_core::CoreError;
use bn_db::DbError;
use thiserror::Error;

/// Stage execution errors
#[derive(Error, Debug)]
pub enum StageError {
    /// Required input file, table or object absent (S001)
    #[error("[S001] Missing input for stage '{stage}': {what}")]
    MissingInput { stage: String, what: String },

    /// Post-condition failed (S002)
    #[error("[S002] Checks failed for stage '{stage}': {summary}")]
    CheckFailed {
        stage: String,
        summary: CheckSummary,
    },

    /// Degenerate price distribution (S003)
    #[error("[S003] Price standard deviation is zero over {rows} rows; z-scores are undefined")]
    ZeroVariance { rows: u64 },

    /// A stage input has no usable rows (S004)
    #[error("[S004] Stage '{stage}' has no rows to work on in {table}")]
    EmptyInput { stage: String, table: String },

    /// Unknown step name (S005)
    #[error("[S005] Unknown step '{0}'")]
    UnknownStep(String),

    /// Tabular store error (S006)
    #[error("[S006] {0}")]
    Db(#[from] DbError),

    /// Core error (S007)
    #[error("[S007] {0}")]
    Core(#[from] CoreError),

    /// Blob store error (S008)
    #[error("[S008] {0}")]
    Blob(#[from] BlobError),

    /// Local filesystem error (S009)
    #[error("[S009] I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Report serialization error (S010)
    #[error("[S010] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet writer error (S011)
    #[error("[S011] XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Result type alias for StageError
pub type StageResult<T> = Result<T, StageError>;

impl StageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn missing(stage: &str, what: impl Into<String>) -> Self {
        StageError::MissingInput {
            stage: stage.to_string(),
            what: what.into(),
        }
    }
}
