//! CLI argument definitions using clap derive API

use bn_stages::Step;
use clap::{Args, Parser, Subcommand};

/// Bottleneck - batch ETL for the wine catalog: clean, deduplicate, join and
/// report on the ERP, web and liaison feeds
#[derive(Parser, Debug)]
#[command(name = "bn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".", env = "BN_PROJECT_DIR")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "BN_CONFIG")]
    pub config: Option<String>,

    /// Override database path (`:memory:` accepted)
    #[arg(short, long, global = true, env = "BN_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload the raw vendor files to data/inputs/
    UploadInputs,

    /// Check the raw vendor files are in the bucket
    VerifyUpload,

    /// Load and filter the raw files
    Clean,

    /// Upload the clean exports to data/outputs/
    UploadClean,

    /// Download the clean exports from the bucket
    FetchClean,

    /// Collapse every feed to one row per business key
    Dedup,

    /// Join the deduplicated feeds
    Fusion,

    /// Copy the database file after fusion
    Snapshot,

    /// Revenue per product and in total
    Revenue,

    /// Price z-scores and vintage classification
    Zscore,

    /// Build and publish the final report
    Report,

    /// Upload the step logs to logs/
    ArchiveLogs,

    /// Re-run the checks of a step against the current tables
    Check(CheckArgs),

    /// Run the whole pipeline graph
    Run,

    /// Create the configured bucket in the local blob store
    CreateBucket,
}

impl Commands {
    /// The pipeline step a subcommand stands for, if any
    pub fn step(&self) -> Option<Step> {
        let step = match self {
            Commands::UploadInputs => Step::UploadInputs,
            Commands::VerifyUpload => Step::VerifyUpload,
            Commands::Clean => Step::Clean,
            Commands::UploadClean => Step::UploadClean,
            Commands::FetchClean => Step::FetchClean,
            Commands::Dedup => Step::Dedup,
            Commands::Fusion => Step::Fusion,
            Commands::Snapshot => Step::Snapshot,
            Commands::Revenue => Step::Revenue,
            Commands::Zscore => Step::ZScore,
            Commands::Report => Step::Report,
            Commands::ArchiveLogs => Step::ArchiveLogs,
            Commands::Check(_) | Commands::Run | Commands::CreateBucket => return None,
        };
        Some(step)
    }
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Step whose checks to run (clean, dedup, fusion, revenue, zscore, report)
    pub step: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
