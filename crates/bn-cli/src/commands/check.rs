//! Re-run the post-conditions of one step

use anyhow::{bail, Result};
use bn_check::CheckRunner;
use bn_stages::{StageContext, Step};
use tracing::Instrument;

use crate::cli::CheckArgs;

pub async fn execute(args: &CheckArgs, ctx: &StageContext) -> Result<()> {
    let step: Step = args.step.parse()?;
    let Some(checks) = step.checks(&ctx.config) else {
        bail!("Step '{}' produces no table and has no checks", step);
    };

    let runner = CheckRunner::new(ctx.db.as_ref());
    let (results, summary) = runner
        .run_all(&checks)
        .instrument(tracing::info_span!("step", step = step.name()))
        .await;
    for result in &results {
        println!("  {}", result);
    }
    println!("\n{}", summary);

    if !summary.all_passed() {
        bail!("{} check(s) of step '{}' did not pass", summary.failed + summary.errors, step);
    }
    Ok(())
}
