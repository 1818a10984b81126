//! Bottleneck CLI - batch ETL for the wine catalog

use anyhow::{bail, Context, Result};
use clap::Parser;

mod cli;
mod commands;
mod context;
mod logging;

use cli::{Cli, Commands};
use commands::{check, create_bucket, run, step};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (root, config) = context::load_config(&cli.global)?;
    let _guard = logging::init(&config.logs_dir(&root), cli.global.verbose)
        .context("Failed to initialize logging")?;

    if let Commands::CreateBucket = cli.command {
        return create_bucket::execute(&root, &config).await;
    }

    let ctx = context::stage_context(root, config)?;
    match &cli.command {
        Commands::Check(args) => check::execute(args, &ctx).await,
        Commands::Run => run::execute(&ctx).await,
        other => {
            let Some(s) = other.step() else {
                bail!("'{:?}' is not a pipeline step", other);
            };
            step::execute(s, &ctx).await
        }
    }
}
