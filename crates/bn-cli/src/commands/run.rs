//! Run the whole pipeline graph and record the outcome of every step

use anyhow::{bail, Context, Result};
use bn_core::StepStatus;
use bn_stages::{run_pipeline, StageContext};

/// Run state file name inside the outputs directory
pub const RUN_STATE_FILE: &str = "run_state.json";

pub async fn execute(ctx: &StageContext) -> Result<()> {
    let state = run_pipeline(ctx).await.context("Failed to schedule the pipeline")?;

    let path = ctx.outputs_dir().join(RUN_STATE_FILE);
    state
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    for step in &state.steps {
        let mark = match step.status {
            StepStatus::Success => "\u{2713}",
            StepStatus::Failed => "\u{2717}",
            StepStatus::Skipped => "-",
        };
        match &step.error {
            Some(e) => println!("  {} {} ({}) {}", mark, step.name, step.status, e),
            None => println!("  {} {} ({}) [{}ms]", mark, step.name, step.status, step.duration_ms),
        }
    }
    println!("\nRun {} {}: state written to {}", state.run_id, state.status, path.display());

    let failed = state.failed_steps();
    if !failed.is_empty() {
        bail!("Pipeline failed at: {}", failed.join(", "));
    }
    Ok(())
}
