//! Command implementations

pub mod check;
pub mod create_bucket;
pub mod run;
pub mod step;
