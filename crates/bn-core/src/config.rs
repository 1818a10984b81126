//! Configuration types and parsing for bottleneck.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names looked up in a project directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["bottleneck.yml", "bottleneck.yaml"];

/// Main pipeline configuration from bottleneck.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pipeline name
    pub name: String,

    /// Local filesystem layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Analytical database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object storage the pipeline publishes to
    #[serde(default)]
    pub blob_store: BlobStoreConfig,

    /// Revenue computation settings
    #[serde(default)]
    pub revenue: RevenueConfig,

    /// Price outlier detection settings
    #[serde(default)]
    pub zscore: ZScoreConfig,

    /// Post-fusion database snapshot settings
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Dataset-specific oracles checked after each stage
    #[serde(default)]
    pub expectations: Expectations,
}

/// Directory layout, relative to the project directory unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Raw and converted vendor files (`erp.csv`, `web.csv`, `liaison.csv`)
    #[serde(default = "default_inputs")]
    pub inputs: String,

    /// Cleaned, derived and report files
    #[serde(default = "default_outputs")]
    pub outputs: String,

    /// Point-in-time database copies
    #[serde(default = "default_snapshots")]
    pub snapshots: String,

    /// Per-step log files
    #[serde(default = "default_logs")]
    pub logs: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            inputs: default_inputs(),
            outputs: default_outputs(),
            snapshots: default_snapshots(),
            logs: default_logs(),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlobStoreConfig {
    /// Bucket every key is written under
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Directory holding one sub-directory per bucket
    #[serde(default = "default_blob_root")]
    pub root: String,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            root: default_blob_root(),
        }
    }
}

/// Revenue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevenueConfig {
    /// Fusion column multiplied by price to obtain revenue
    #[serde(default = "default_quantity_column")]
    pub quantity_column: String,
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            quantity_column: default_quantity_column(),
        }
    }
}

/// Which standard deviation the z-score divides by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    /// Divide by N
    #[default]
    Population,
    /// Divide by N - 1
    Sample,
}

impl std::fmt::Display for Deviation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deviation::Population => write!(f, "population"),
            Deviation::Sample => write!(f, "sample"),
        }
    }
}

/// Z-score settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZScoreConfig {
    /// A price is an outlier when its z-score is strictly above this value
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub deviation: Deviation,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            deviation: Deviation::default(),
        }
    }
}

/// Snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Suffix appended to the database file stem
    #[serde(default = "default_snapshot_label")]
    pub label: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            label: default_snapshot_label(),
        }
    }
}

/// Expected values for one reference dataset.
///
/// Each value that is set becomes a fatal check for the stage producing it
/// and fills the "expected" column of the final report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    #[serde(default)]
    pub erp_dedup_rows: Option<u64>,
    #[serde(default)]
    pub web_dedup_rows: Option<u64>,
    #[serde(default)]
    pub liaison_dedup_rows: Option<u64>,
    #[serde(default)]
    pub fusion_rows: Option<u64>,
    #[serde(default)]
    pub revenue_rows: Option<u64>,
    #[serde(default)]
    pub revenue_total: Option<f64>,
    #[serde(default)]
    pub vintage_rows: Option<u64>,
}

fn default_inputs() -> String {
    "data/inputs".to_string()
}

fn default_outputs() -> String {
    "data/outputs".to_string()
}

fn default_snapshots() -> String {
    "data/snapshots".to_string()
}

fn default_logs() -> String {
    "logs".to_string()
}

const IN_MEMORY: &str = ":memory:";

fn default_db_path() -> String {
    "data/bottleneck.duckdb".to_string()
}

fn default_bucket() -> String {
    "bottleneck".to_string()
}

fn default_blob_root() -> String {
    "blob".to_string()
}

fn default_quantity_column() -> String {
    "stock_quantity".to_string()
}

fn default_threshold() -> f64 {
    2.0
}

fn default_snapshot_label() -> String {
    "fusion_ok".to_string()
}

impl Config {
    /// Configuration with every default, for a pipeline called `name`
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            paths: PathsConfig::default(),
            database: DatabaseConfig::default(),
            blob_store: BlobStoreConfig::default(),
            revenue: RevenueConfig::default(),
            zscore: ZScoreConfig::default(),
            snapshot: SnapshotConfig::default(),
            expectations: Expectations::default(),
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml(&content)?;
        log::debug!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for bottleneck.yml or bottleneck.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .map_or_else(
                || {
                    Err(CoreError::ConfigNotFound {
                        path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                    })
                },
                |p| Self::load(&p),
            )
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.name.trim().is_empty() {
            return invalid("Pipeline name cannot be empty".to_string());
        }
        if !self.zscore.threshold.is_finite() || self.zscore.threshold <= 0.0 {
            return invalid(format!(
                "zscore.threshold must be a positive finite number, got {}",
                self.zscore.threshold
            ));
        }
        if self.revenue.quantity_column.trim().is_empty() {
            return invalid("revenue.quantity_column cannot be empty".to_string());
        }
        if self.blob_store.bucket.trim().is_empty() {
            return invalid("blob_store.bucket cannot be empty".to_string());
        }
        if self.snapshot.label.is_empty()
            || !self
                .snapshot
                .label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return invalid(format!(
                "snapshot.label must be non-empty and contain only [A-Za-z0-9_-], got '{}'",
                self.snapshot.label
            ));
        }
        if let Some(total) = self.expectations.revenue_total {
            if !total.is_finite() || total < 0.0 {
                return invalid(format!(
                    "expectations.revenue_total must be a non-negative finite number, got {}",
                    total
                ));
            }
        }
        Ok(())
    }

    /// Whether the database lives in memory only
    pub fn is_in_memory(&self) -> bool {
        self.database.path == IN_MEMORY
    }

    /// Resolve a configured path against the project root
    fn resolve(root: &Path, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            root.join(p)
        }
    }

    pub fn inputs_dir(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.paths.inputs)
    }

    pub fn outputs_dir(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.paths.outputs)
    }

    pub fn snapshots_dir(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.paths.snapshots)
    }

    pub fn logs_dir(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.paths.logs)
    }

    pub fn blob_root(&self, root: &Path) -> PathBuf {
        Self::resolve(root, &self.blob_store.root)
    }

    /// Database location as passed to the backend (`:memory:` untouched)
    pub fn database_location(&self, root: &Path) -> String {
        if self.is_in_memory() {
            IN_MEMORY.to_string()
        } else {
            Self::resolve(root, &self.database.path)
                .display()
                .to_string()
        }
    }

    /// Snapshot file written after fusion: `<snapshots>/<db-stem>_<label>.duckdb`
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        let stem = Path::new(&self.database.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("database");
        self.snapshots_dir(root)
            .join(format!("{}_{}.duckdb", stem, self.snapshot.label))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
