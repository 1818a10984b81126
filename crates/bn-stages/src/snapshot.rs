//! Point-in-time copy of the database file taken after fusion

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::tables;
use std::path::{Path, PathBuf};

pub const STAGE: &str = "snapshot";

/// Flush the database and copy its file to the snapshot path, replacing
/// any previous snapshot with the same label.
pub async fn run(ctx: &StageContext) -> StageResult<PathBuf> {
    if ctx.config.is_in_memory() {
        return Err(StageError::missing(
            STAGE,
            "a database file (the database is in memory)",
        ));
    }
    ctx.require_tables(STAGE, &[tables::fusion()]).await?;

    let source = PathBuf::from(ctx.config.database_location(&ctx.root));
    ctx.require_file(STAGE, &source)?;
    ctx.db.checkpoint().await?;

    let target = ctx.config.snapshot_path(&ctx.root);
    copy(&source, &target).await?;
    log::info!("snapshot {} -> {}", source.display(), target.display());
    Ok(target)
}

async fn copy(source: &Path, target: &Path) -> StageResult<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StageError::io(parent, e))?;
    }
    tokio::fs::copy(source, target)
        .await
        .map_err(|e| StageError::io(target, e))?;
    Ok(())
}
