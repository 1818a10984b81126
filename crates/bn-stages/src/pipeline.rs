//! Pipeline steps, their dependency graph and the in-process run harness

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::{clean, dedup, fusion, report, revenue, snapshot, transfer, zscore};
use bn_check::Check;
use bn_core::{Config, RunState, StepGraph, StepSpec, StepStatus};
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::Instrument;

/// Every step the `bn` binary can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    UploadInputs,
    VerifyUpload,
    Clean,
    UploadClean,
    FetchClean,
    Dedup,
    Fusion,
    Snapshot,
    Revenue,
    ZScore,
    Report,
    ArchiveLogs,
}

impl Step {
    pub const ALL: [Step; 12] = [
        Step::UploadInputs,
        Step::VerifyUpload,
        Step::Clean,
        Step::UploadClean,
        Step::FetchClean,
        Step::Dedup,
        Step::Fusion,
        Step::Snapshot,
        Step::Revenue,
        Step::ZScore,
        Step::Report,
        Step::ArchiveLogs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::UploadInputs => transfer::UPLOAD_INPUTS,
            Step::VerifyUpload => transfer::VERIFY_UPLOAD,
            Step::Clean => clean::STAGE,
            Step::UploadClean => transfer::UPLOAD_CLEAN,
            Step::FetchClean => transfer::FETCH_CLEAN,
            Step::Dedup => dedup::STAGE,
            Step::Fusion => fusion::STAGE,
            Step::Snapshot => snapshot::STAGE,
            Step::Revenue => revenue::STAGE,
            Step::ZScore => zscore::STAGE,
            Step::Report => report::STAGE,
            Step::ArchiveLogs => transfer::ARCHIVE_LOGS,
        }
    }

    /// Post-conditions of the step, `None` for steps that produce no table
    pub fn checks(self, config: &Config) -> Option<Vec<Check>> {
        match self {
            Step::Clean => Some(clean::checks(config)),
            Step::Dedup => Some(dedup::checks(config)),
            Step::Fusion => Some(fusion::checks(config)),
            Step::Revenue => Some(revenue::checks(config)),
            Step::ZScore => Some(zscore::checks(config)),
            Step::Report => Some(report::checks(config)),
            _ => None,
        }
    }

    /// Run the step and describe what it produced
    pub async fn run(self, ctx: &StageContext) -> StageResult<String> {
        let summary = match self {
            Step::UploadInputs => {
                format!("{} objects uploaded", transfer::upload_inputs(ctx).await?.len())
            }
            Step::VerifyUpload => {
                format!("{} objects found", transfer::verify_upload(ctx).await?.len())
            }
            Step::Clean => clean::run(ctx)
                .await?
                .iter()
                .map(|s| format!("{} {}/{}", s.feed, s.clean_rows, s.initial_rows))
                .collect::<Vec<_>>()
                .join(", "),
            Step::UploadClean => {
                format!("{} objects uploaded", transfer::upload_clean(ctx).await?.len())
            }
            Step::FetchClean => {
                format!("{} files downloaded", transfer::fetch_clean(ctx).await?.len())
            }
            Step::Dedup => dedup::run(ctx)
                .await?
                .iter()
                .map(|t| format!("{} {}", t.name, t.rows))
                .collect::<Vec<_>>()
                .join(", "),
            Step::Fusion => format!("{} rows", fusion::run(ctx).await?.rows),
            Step::Snapshot => snapshot::run(ctx).await?.display().to_string(),
            Step::Revenue => {
                let r = revenue::run(ctx).await?;
                format!("{} products, total {:.2}", r.products, r.total)
            }
            Step::ZScore => {
                let z = zscore::run(ctx).await?;
                format!("{} vintage, {} ordinary", z.vintage, z.ordinary)
            }
            Step::Report => {
                let out = report::run(ctx).await?;
                format!(
                    "{} rows, {} mismatches",
                    out.report.rows.len(),
                    out.report.mismatches().count()
                )
            }
            Step::ArchiveLogs => {
                format!("{} logs archived", transfer::archive_logs(ctx).await?.len())
            }
        };
        Ok(summary)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.name() == s)
            .ok_or_else(|| StageError::UnknownStep(s.to_string()))
    }
}

/// The scheduled pipeline. `fetch-clean` is only run on demand.
pub fn pipeline_specs() -> Vec<StepSpec> {
    vec![
        StepSpec::new(transfer::UPLOAD_INPUTS, &[]),
        StepSpec::new(transfer::VERIFY_UPLOAD, &[transfer::UPLOAD_INPUTS]),
        StepSpec::new(clean::STAGE, &[transfer::VERIFY_UPLOAD]),
        StepSpec::new(transfer::UPLOAD_CLEAN, &[clean::STAGE]),
        StepSpec::new(dedup::STAGE, &[transfer::UPLOAD_CLEAN]),
        StepSpec::new(fusion::STAGE, &[dedup::STAGE]),
        StepSpec::new(snapshot::STAGE, &[fusion::STAGE]),
        StepSpec::new(revenue::STAGE, &[snapshot::STAGE]),
        StepSpec::new(zscore::STAGE, &[snapshot::STAGE]),
        StepSpec::new(report::STAGE, &[revenue::STAGE, zscore::STAGE]),
        StepSpec::new(transfer::ARCHIVE_LOGS, &[report::STAGE]).always(),
    ]
}

pub fn pipeline_graph() -> StageResult<StepGraph> {
    Ok(StepGraph::build(&pipeline_specs())?)
}

/// Run one step inside a `step` span so its events can be routed to the
/// step's own log file.
async fn run_recorded(step: Step, ctx: &StageContext) -> (StepStatus, u64, Option<String>) {
    let span = tracing::info_span!("step", step = step.name());
    let start = Instant::now();
    let result = step.run(ctx).instrument(span.clone()).await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let _entered = span.enter();
    match result {
        Ok(summary) => {
            log::info!("step={} status=success {} [{}ms]", step, summary, duration_ms);
            (StepStatus::Success, duration_ms, None)
        }
        Err(e) => {
            log::error!("step={} status=failed {} [{}ms]", step, e, duration_ms);
            (StepStatus::Failed, duration_ms, Some(e.to_string()))
        }
    }
}

/// Execute the graph level by level. Steps of one level run concurrently; a
/// step whose trigger is not satisfied is recorded as skipped.
pub async fn run_graph(ctx: &StageContext, graph: &StepGraph) -> StageResult<RunState> {
    let mut state = RunState::new();
    let mut outcomes: HashMap<String, StepStatus> = HashMap::new();

    for level in graph.levels()? {
        let mut runnable = Vec::new();
        for name in &level {
            let step: Step = name.parse()?;
            if graph.ready(name, &outcomes) {
                runnable.push(step);
            } else {
                log::warn!("step={} skipped: upstream did not succeed", name);
                outcomes.insert(name.clone(), StepStatus::Skipped);
                state.record(name, StepStatus::Skipped, 0, None);
            }
        }

        let results = join_all(runnable.iter().map(|step| run_recorded(*step, ctx))).await;
        for (step, (status, duration_ms, error)) in runnable.iter().zip(results) {
            outcomes.insert(step.name().to_string(), status);
            state.record(step.name(), status, duration_ms, error);
        }
    }

    state.finish();
    Ok(state)
}

/// Run the scheduled pipeline end to end
pub async fn run_pipeline(ctx: &StageContext) -> StageResult<RunState> {
    run_graph(ctx, &pipeline_graph()?).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_round_trip() {
        for step in Step::ALL {
            assert_eq!(step.name().parse::<Step>().unwrap(), step);
        }
        assert!(matches!(
            "nope".parse::<Step>(),
            Err(StageError::UnknownStep(s)) if s == "nope"
        ));
    }

    #[test]
    fn test_pipeline_levels() {
        let graph = pipeline_graph().unwrap();
        let levels = graph.levels().unwrap();
        assert_eq!(levels.first().unwrap(), &vec!["upload-inputs".to_string()]);
        assert!(levels.contains(&vec!["revenue".to_string(), "zscore".to_string()]));
        assert_eq!(levels.last().unwrap(), &vec!["archive-logs".to_string()]);
        assert!(!graph.contains("fetch-clean"));
    }

    #[test]
    fn test_archive_runs_after_failure() {
        let graph = pipeline_graph().unwrap();
        let outcomes = HashMap::from([("report".to_string(), StepStatus::Skipped)]);
        assert!(graph.ready("archive-logs", &outcomes));
        let outcomes = HashMap::from([("snapshot".to_string(), StepStatus::Failed)]);
        assert!(!graph.ready("revenue", &outcomes));
    }

    #[test]
    fn test_checks_only_for_table_steps() {
        let config = Config::with_name("t");
        assert!(Step::Fusion.checks(&config).is_some());
        assert!(Step::UploadInputs.checks(&config).is_none());
    }
}
