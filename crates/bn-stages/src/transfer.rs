//! Transfers between the local data directories and the blob store

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::tables::{Feed, INPUTS_PREFIX, LOGS_PREFIX, OUTPUTS_PREFIX};
use crate::blob::BlobError;
use std::path::{Path, PathBuf};

pub const UPLOAD_INPUTS: &str = "upload-inputs";
pub const VERIFY_UPLOAD: &str = "verify-upload";
pub const UPLOAD_CLEAN: &str = "upload-clean";
pub const FETCH_CLEAN: &str = "fetch-clean";
pub const ARCHIVE_LOGS: &str = "archive-logs";

async fn require_bucket(ctx: &StageContext) -> StageResult<()> {
    if ctx.blob.bucket_exists(ctx.bucket()).await? {
        Ok(())
    } else {
        Err(BlobError::BucketNotFound(ctx.bucket().to_string()).into())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Upload local files under `prefix`, keyed by file name
async fn upload_files(
    ctx: &StageContext,
    stage: &str,
    files: &[PathBuf],
    prefix: &str,
) -> StageResult<Vec<String>> {
    require_bucket(ctx).await?;
    for path in files {
        ctx.require_file(stage, path)?;
    }

    let mut keys = Vec::with_capacity(files.len());
    for path in files {
        let key = format!("{}{}", prefix, file_name(path));
        ctx.blob.upload(ctx.bucket(), path, &key).await?;
        log::info!("uploaded {} -> {}/{}", path.display(), ctx.bucket(), key);
        keys.push(key);
    }
    Ok(keys)
}

/// Publish derived files under `data/outputs/`
pub async fn upload_outputs(
    ctx: &StageContext,
    stage: &str,
    files: &[PathBuf],
) -> StageResult<Vec<String>> {
    upload_files(ctx, stage, files, OUTPUTS_PREFIX).await
}

/// Raw vendor files to `data/inputs/`
pub async fn upload_inputs(ctx: &StageContext) -> StageResult<Vec<String>> {
    let files: Vec<PathBuf> = Feed::ALL
        .iter()
        .map(|f| ctx.input_path(&f.file_name()))
        .collect();
    upload_files(ctx, UPLOAD_INPUTS, &files, INPUTS_PREFIX).await
}

/// Require every raw file key under `data/inputs/`
pub async fn verify_upload(ctx: &StageContext) -> StageResult<Vec<String>> {
    require_bucket(ctx).await?;
    let keys = ctx.blob.list(ctx.bucket(), INPUTS_PREFIX).await?;
    let missing: Vec<String> = Feed::ALL
        .iter()
        .map(|f| format!("{}{}", INPUTS_PREFIX, f.file_name()))
        .filter(|k| !keys.contains(k))
        .collect();

    if !missing.is_empty() {
        return Err(StageError::missing(
            VERIFY_UPLOAD,
            format!("objects [{}] in bucket {}", missing.join(", "), ctx.bucket()),
        ));
    }
    log::info!("found {} objects under {}", keys.len(), INPUTS_PREFIX);
    Ok(keys)
}

fn clean_files(ctx: &StageContext) -> Vec<PathBuf> {
    Feed::ALL
        .iter()
        .map(|f| ctx.output_path(&f.clean_table().csv_file_name()))
        .collect()
}

/// Clean CSV exports to `data/outputs/`
pub async fn upload_clean(ctx: &StageContext) -> StageResult<Vec<String>> {
    upload_files(ctx, UPLOAD_CLEAN, &clean_files(ctx), OUTPUTS_PREFIX).await
}

/// Download the clean CSV exports back into the outputs directory
pub async fn fetch_clean(ctx: &StageContext) -> StageResult<Vec<PathBuf>> {
    require_bucket(ctx).await?;
    let files = clean_files(ctx);
    for path in &files {
        let key = format!("{}{}", OUTPUTS_PREFIX, file_name(path));
        ctx.blob
            .download(ctx.bucket(), &key, path)
            .await
            .map_err(|e| match e {
                BlobError::ObjectNotFound { key, .. } => {
                    StageError::missing(FETCH_CLEAN, format!("object {}", key))
                }
                other => other.into(),
            })?;
        log::info!("downloaded {}/{} -> {}", ctx.bucket(), key, path.display());
    }
    Ok(files)
}

/// Upload every `*.log` file of the logs directory to `logs/`.
///
/// Having nothing to archive is not an error.
pub async fn archive_logs(ctx: &StageContext) -> StageResult<Vec<String>> {
    let dir = ctx.logs_dir();
    let mut logs = Vec::new();
    if dir.is_dir() {
        let entries = std::fs::read_dir(&dir).map_err(|e| StageError::io(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StageError::io(&dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
                logs.push(path);
            }
        }
    }
    logs.sort();

    if logs.is_empty() {
        log::warn!("no log files to archive in {}", dir.display());
        return Ok(Vec::new());
    }
    upload_files(ctx, ARCHIVE_LOGS, &logs, LOGS_PREFIX).await
}
