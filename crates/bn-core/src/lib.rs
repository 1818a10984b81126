//! bn-core - Core library for Bottleneck
//!
//! This crate provides the configuration model, the error taxonomy, the
//! declarative transform types consumed by the tabular store, and the step
//! graph used to drive a pipeline run.

pub mod config;
pub mod error;
pub mod run_state;
pub mod steps;
pub mod table_name;
pub mod transform;

pub use config::{Config, Deviation, Expectations};
pub use error::{CoreError, CoreResult};
pub use run_state::{RunState, RunStatus, StepRecord, StepStatus};
pub use steps::{StepGraph, StepSpec, Trigger};
pub use table_name::TableName;
pub use transform::{
    AggFunc, Aggregate, BinaryOp, CompareOp, Expr, JoinClause, JoinInput, OrderKey, Predicate,
    Projection, ScalarQuery, Source, Transform, Value,
};
