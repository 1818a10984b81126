//! Run a single pipeline step

use anyhow::{Context, Result};
use bn_stages::{StageContext, Step};
use std::time::Instant;
use tracing::Instrument;

/// Execute one step inside its `step` span
pub async fn execute(step: Step, ctx: &StageContext) -> Result<()> {
    let start = Instant::now();
    let summary = step
        .run(ctx)
        .instrument(tracing::info_span!("step", step = step.name()))
        .await
        .with_context(|| format!("Step '{}' failed", step))?;

    println!(
        "  \u{2713} {} - {} [{}ms]",
        step,
        summary,
        start.elapsed().as_millis()
    );
    Ok(())
}
