//! Cleaning: per-feed validity filtering of the raw vendor files

use crate::context::StageContext;
use crate::error::StageResult;
use crate::tables::{self, Feed};
use bn_check::Check;
use bn_core::{Config, Source, Transform, Value};

pub const STAGE: &str = "clean";

/// Row counts of one feed before and after cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    pub feed: Feed,
    pub initial_rows: u64,
    pub clean_rows: u64,
}

impl CleanStats {
    pub fn excluded_rows(&self) -> u64 {
        self.initial_rows.saturating_sub(self.clean_rows)
    }
}

/// Load the three raw files, filter them, export the clean tables and the
/// `resume_stats` summary.
pub async fn run(ctx: &StageContext) -> StageResult<Vec<CleanStats>> {
    // Every raw file must be present before anything is replaced.
    for feed in Feed::ALL {
        ctx.require_file(STAGE, &ctx.input_path(&feed.file_name()))?;
    }

    let mut stats = Vec::with_capacity(Feed::ALL.len());
    for feed in Feed::ALL {
        let raw = ctx
            .db
            .load_csv(&feed.raw_table(), &ctx.input_path(&feed.file_name()))
            .await?;
        let clean = ctx
            .create(
                &feed.clean_table(),
                &Transform::Filter {
                    source: Source::from(feed.raw_table()),
                    predicate: feed.clean_rule(),
                },
            )
            .await?;
        ctx.export(&feed.clean_table()).await?;

        let s = CleanStats {
            feed,
            initial_rows: raw.rows,
            clean_rows: clean.rows,
        };
        log::info!(
            "source={} initial_rows={} clean_rows={} excluded_rows={}",
            feed,
            s.initial_rows,
            s.clean_rows,
            s.excluded_rows()
        );
        stats.push(s);
    }

    ctx.create(&tables::resume_stats(), &summary_transform(&stats))
        .await?;
    ctx.export(&tables::resume_stats()).await?;

    ctx.verify(STAGE, &checks(&ctx.config)).await?;
    Ok(stats)
}

fn summary_transform(stats: &[CleanStats]) -> Transform {
    let count = |n: u64| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
    Transform::Values {
        columns: ["source", "initial_rows", "clean_rows", "excluded_rows"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows: stats
            .iter()
            .map(|s| {
                vec![
                    Value::from(s.feed.name()),
                    count(s.initial_rows),
                    count(s.clean_rows),
                    count(s.excluded_rows()),
                ]
            })
            .collect(),
    }
}

/// Every clean table has rows and none breaks its feed's rule
pub fn checks(_config: &Config) -> Vec<Check> {
    Feed::ALL
        .iter()
        .flat_map(|feed| {
            let table = feed.clean_table();
            [
                Check::not_empty(&table),
                Check::all_satisfy(
                    &format!("rule_{}", table.table()),
                    &table,
                    feed.clean_rule(),
                ),
            ]
        })
        .collect()
}
