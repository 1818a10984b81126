//! Key-value blob store the pipeline publishes its files to

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Blob store errors
#[derive(Error, Debug)]
pub enum BlobError {
    /// Bucket missing or unreachable (B001)
    #[error("[B001] Bucket not found or inaccessible: {0}")]
    BucketNotFound(String),

    /// Key missing (B002)
    #[error("[B002] Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// Key that would escape the bucket (B003)
    #[error("[B003] Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Underlying I/O failure (B004)
    #[error("[B004] Blob store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for BlobError
pub type BlobResult<T> = Result<T, BlobError>;

/// Object storage with path-prefixed keys (`data/inputs/erp.csv`)
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether the bucket exists and is reachable
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool>;

    /// Store `bytes` under `key`, replacing any previous object
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobResult<()>;

    /// Fetch the object stored under `key`
    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Vec<u8>>;

    /// Keys starting with `prefix`, sorted
    async fn list(&self, bucket: &str, prefix: &str) -> BlobResult<Vec<String>>;

    /// Upload a local file
    async fn upload(&self, bucket: &str, path: &Path, key: &str) -> BlobResult<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| BlobError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.put(bucket, key, bytes).await
    }

    /// Download an object to a local file, creating parent directories
    async fn download(&self, bucket: &str, key: &str, path: &Path) -> BlobResult<()> {
        let bytes = self.get(bucket, key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| io_error(path, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> BlobError {
    BlobError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Filesystem-backed store: one directory per bucket under `root`,
/// keys map to relative file paths.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the bucket directory if needed
    pub async fn create_bucket(&self, bucket: &str) -> BlobResult<()> {
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;
        log::info!("Bucket '{}' ready at {}", bucket, dir.display());
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> BlobResult<PathBuf> {
        validate_relative(bucket)?;
        if bucket.contains('/') {
            return Err(BlobError::InvalidKey {
                key: bucket.to_string(),
                reason: "bucket names cannot contain '/'".to_string(),
            });
        }
        Ok(self.root.join(bucket))
    }

    async fn existing_bucket(&self, bucket: &str) -> BlobResult<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        if tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            Ok(dir)
        } else {
            Err(BlobError::BucketNotFound(bucket.to_string()))
        }
    }

    fn collect_keys(dir: &Path, base: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_keys(&path, base, out)?;
            } else if let Ok(rel) = path.strip_prefix(base) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
        Ok(())
    }
}

/// Reject empty, absolute and parent-relative keys
fn validate_relative(key: &str) -> BlobResult<()> {
    let invalid = |reason: &str| BlobError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("empty"));
    }
    let path = Path::new(key);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(invalid("must be a relative path without '..'"));
    }
    Ok(())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        Ok(tokio::fs::metadata(&dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobResult<()> {
        validate_relative(key)?;
        let path = self.existing_bucket(bucket).await?.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error(&path, e))?;
        log::debug!("put {}/{}", bucket, key);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Vec<u8>> {
        validate_relative(key)?;
        let path = self.existing_bucket(bucket).await?.join(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> BlobResult<Vec<String>> {
        let dir = self.existing_bucket(bucket).await?;
        let mut keys = Vec::new();
        Self::collect_keys(&dir, &dir, &mut keys).map_err(|e| io_error(&dir, e))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
#[path = "blob_test.rs"]
mod tests;
