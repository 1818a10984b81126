//! bn-stages - Pipeline stages for Bottleneck
//!
//! Each stage reads the tables of the previous one from the tabular store,
//! materializes its own, runs its checks and exports what downstream
//! consumers need. Transfer steps move files between the local data
//! directories and the blob store.

pub mod blob;
pub mod clean;
pub mod context;
pub mod dedup;
pub mod error;
pub mod fusion;
pub mod pipeline;
pub mod report;
pub mod revenue;
pub mod snapshot;
pub mod tables;
pub mod transfer;
pub mod zscore;

pub use blob::{BlobError, BlobResult, BlobStore, LocalBlobStore};
pub use context::StageContext;
pub use error::{StageError, StageResult};
pub use pipeline::{pipeline_graph, pipeline_specs, run_graph, run_pipeline, Step};
pub use tables::Feed;
