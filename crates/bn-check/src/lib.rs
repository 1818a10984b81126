//! bn-check - Post-condition checks for Bottleneck
//!
//! Every stage declares the checks its output must satisfy. The same
//! definitions run right after the stage and standalone from `bn check`.

pub mod check;
pub mod runner;

pub use check::{Check, CheckKind};
pub use runner::{CheckResult, CheckRunner, CheckSummary};
