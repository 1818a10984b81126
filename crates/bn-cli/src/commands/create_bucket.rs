//! Create the configured bucket in the filesystem blob store

use anyhow::{Context, Result};
use bn_core::Config;
use bn_stages::LocalBlobStore;
use std::path::Path;

pub async fn execute(root: &Path, config: &Config) -> Result<()> {
    let store = LocalBlobStore::new(config.blob_root(root));
    let bucket = &config.blob_store.bucket;
    store
        .create_bucket(bucket)
        .await
        .with_context(|| format!("Failed to create bucket '{}'", bucket))?;
    println!("Bucket '{}' ready under {}", bucket, store.root().display());
    Ok(())
}
