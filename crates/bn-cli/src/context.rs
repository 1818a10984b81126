//! Runtime context for CLI commands

use anyhow::{Context, Result};
use bn_core::Config;
use bn_db::{Database, DuckDbBackend};
use bn_stages::{BlobStore, LocalBlobStore, StageContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Project directory and its configuration, with CLI overrides applied
pub fn load_config(args: &GlobalArgs) -> Result<(PathBuf, Config)> {
    let root = PathBuf::from(&args.project_dir);

    let mut config = if let Some(config_path) = &args.config {
        Config::load(Path::new(config_path)).context("Failed to load configuration file")?
    } else {
        Config::load_from_dir(&root).context("Failed to load project configuration")?
    };

    if let Some(database) = &args.database {
        config.database.path = database.clone();
    }
    Ok((root, config))
}

/// Open the store and the blob store the stages run against
pub fn stage_context(root: PathBuf, config: Config) -> Result<StageContext> {
    let location = config.database_location(&root);
    let db: Arc<dyn Database> =
        Arc::new(DuckDbBackend::new(&location).context("Failed to connect to database")?);
    let blob: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.blob_root(&root)));
    log::debug!("database={} blob_root={}", location, config.blob_root(&root).display());
    Ok(StageContext::new(config, root, db, blob))
}
