//! Price z-score and vintage/ordinary classification

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::tables;
use crate::transfer;
use bn_check::Check;
use bn_core::{
    AggFunc, CompareOp, Config, Deviation, Expr, OrderKey, Predicate, Projection, ScalarQuery,
    Source, Transform,
};

pub const STAGE: &str = "zscore";

pub const Z_COLUMN: &str = "z_score";
pub const CLASS_COLUMN: &str = "wine_class";
pub const VINTAGE: &str = "vintage";
pub const ORDINARY: &str = "ordinary";

/// Price distribution the scores are computed against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    pub rows: u64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Outcome of the z-score stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreSummary {
    pub stats: PriceStats,
    pub vintage: u64,
    pub ordinary: u64,
}

fn priced() -> Predicate {
    Predicate::not_null("price")
}

fn z_expr(stats: &PriceStats) -> Expr {
    Expr::col("price")
        .sub(Expr::lit(stats.mean))
        .div(Expr::lit(stats.std_dev))
}

/// Mean and standard deviation of fusion prices.
///
/// A missing or zero deviation is rejected instead of producing infinite
/// scores.
pub async fn price_stats(ctx: &StageContext) -> StageResult<PriceStats> {
    let fusion = tables::fusion();
    let rows = ctx
        .db
        .scalar_i64(&ScalarQuery::count_where(&fusion, priced()))
        .await?;
    let rows = u64::try_from(rows).unwrap_or(0);
    if rows == 0 {
        return Err(StageError::EmptyInput {
            stage: STAGE.to_string(),
            table: fusion.to_string(),
        });
    }

    let aggregate = |func| {
        ScalarQuery::aggregate(&fusion, func, Expr::col("price")).with_filter(priced())
    };
    let mean = ctx.db.scalar_f64(&aggregate(AggFunc::Avg)).await?;
    let deviation = match ctx.config.zscore.deviation {
        Deviation::Population => AggFunc::StddevPop,
        Deviation::Sample => AggFunc::StddevSamp,
    };
    let std_dev = ctx.db.scalar_f64(&aggregate(deviation)).await?;

    match (mean, std_dev) {
        (Some(mean), Some(std_dev))
            if mean.is_finite() && std_dev.is_finite() && std_dev > 0.0 =>
        {
            Ok(PriceStats {
                rows,
                mean,
                std_dev,
            })
        }
        _ => Err(StageError::ZeroVariance { rows }),
    }
}

/// Scored fusion rows: product_id, post_title, price, z_score, wine_class
pub fn scored(stats: &PriceStats, threshold: f64) -> Transform {
    let z = z_expr(stats);
    Transform::Project {
        source: Source::from(tables::fusion()),
        columns: vec![
            Projection::column("product_id"),
            Projection::column("post_title"),
            Projection::column("price"),
            Projection::named(z.clone(), Z_COLUMN),
            Projection::named(
                Expr::case(
                    Predicate::compare(z, CompareOp::Gt, Expr::lit(threshold)),
                    Expr::lit(VINTAGE),
                    Expr::lit(ORDINARY),
                ),
                CLASS_COLUMN,
            ),
        ],
        filter: Some(priced()),
        order_by: vec![OrderKey::desc(Z_COLUMN)],
    }
}

fn of_class(class: &str) -> Transform {
    Transform::Filter {
        source: Source::from(tables::zscore()),
        predicate: Predicate::eq(CLASS_COLUMN, class),
    }
}

pub async fn run(ctx: &StageContext) -> StageResult<ZScoreSummary> {
    ctx.require_tables(STAGE, &[tables::fusion()]).await?;

    let stats = price_stats(ctx).await?;
    log::info!(
        "price rows={} mean={:.4} std_dev={:.4} deviation={}",
        stats.rows,
        stats.mean,
        stats.std_dev,
        ctx.config.zscore.deviation
    );

    ctx.create(&tables::zscore(), &scored(&stats, ctx.config.zscore.threshold))
        .await?;
    let vintage = ctx.create(&tables::vintage(), &of_class(VINTAGE)).await?;
    let ordinary = ctx.create(&tables::ordinary(), &of_class(ORDINARY)).await?;
    log::info!(
        "vintage={} ordinary={} threshold={}",
        vintage.rows,
        ordinary.rows,
        ctx.config.zscore.threshold
    );

    ctx.verify(STAGE, &checks(&ctx.config)).await?;

    let files = [
        ctx.export(&tables::vintage()).await?,
        ctx.export(&tables::ordinary()).await?,
    ];
    transfer::upload_outputs(ctx, STAGE, &files).await?;

    Ok(ZScoreSummary {
        stats,
        vintage: vintage.rows,
        ordinary: ordinary.rows,
    })
}

/// Finite non-null scores, classification consistent with the threshold,
/// and the configured outlier count
pub fn checks(config: &Config) -> Vec<Check> {
    let threshold = config.zscore.threshold;
    let scores = tables::zscore();
    let vintage = tables::vintage();
    let finite = Predicate::all_not_null(&["price", Z_COLUMN])
        .and(Predicate::finite("price"))
        .and(Predicate::finite(Z_COLUMN));
    let above = || Predicate::compare(Expr::col(Z_COLUMN), CompareOp::Gt, Expr::lit(threshold));
    let at_most =
        || Predicate::compare(Expr::col(Z_COLUMN), CompareOp::LtEq, Expr::lit(threshold));

    let mut checks = vec![
        Check::not_empty(&scores),
        Check::all_satisfy("finite_scores", &scores, finite.clone()),
        Check::all_satisfy(
            "outlier_iff_above_threshold",
            &scores,
            Predicate::any([
                above().and(Predicate::eq(CLASS_COLUMN, VINTAGE)),
                at_most().and(Predicate::eq(CLASS_COLUMN, ORDINARY)),
            ]),
        ),
        Check::all_satisfy("finite_vintage_scores", &vintage, finite),
        Check::row_count_matches(
            "vintage_partition",
            &vintage,
            ScalarQuery::count_where(&scores, above()),
        ),
    ];
    if let Some(rows) = config.expectations.vintage_rows {
        checks.push(Check::row_count(&vintage, rows));
    }
    checks
}
