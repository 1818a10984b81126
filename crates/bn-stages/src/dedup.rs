//! Deduplication: collapse every feed to one row per business key

use crate::context::StageContext;
use crate::error::StageResult;
use crate::tables::Feed;
use bn_check::Check;
use bn_core::{AggFunc, Aggregate, Config, OrderKey, Predicate, Source, Transform};
use bn_db::TableInfo;

pub const STAGE: &str = "dedup";

/// ERP columns reconciled independently with MAX across duplicates
const ERP_RECONCILED: [&str; 4] = ["onsale_web", "price", "stock_quantity", "stock_status"];

/// Reconciliation rule for one feed
pub fn transform(feed: Feed) -> Transform {
    let source = Source::from(feed.clean_table());
    match feed {
        // Column-wise MAX: the kept row may combine values from different
        // duplicates.
        Feed::Erp => Transform::Aggregate {
            source,
            filter: None,
            group_by: vec![feed.key().to_string()],
            aggregates: ERP_RECONCILED
                .iter()
                .map(|c| Aggregate::same_name(AggFunc::Max, c))
                .collect(),
        },
        Feed::Liaison => Transform::Aggregate {
            source,
            filter: None,
            group_by: vec![feed.key().to_string()],
            aggregates: vec![Aggregate::same_name(AggFunc::Min, "id_web")],
        },
        // Latest product post per SKU; equal dates keep the first title
        Feed::Web => Transform::Rank {
            source,
            filter: Some(product_posts()),
            partition_by: vec![feed.key().to_string()],
            order_by: vec![OrderKey::desc("post_date"), OrderKey::asc("post_title")],
            keep: 1,
        },
    }
}

fn product_posts() -> Predicate {
    Predicate::eq("post_type", "product")
}

pub async fn run(ctx: &StageContext) -> StageResult<Vec<TableInfo>> {
    let clean: Vec<_> = Feed::ALL.iter().map(|f| f.clean_table()).collect();
    ctx.require_tables(STAGE, &clean).await?;

    let mut produced = Vec::with_capacity(Feed::ALL.len());
    for feed in Feed::ALL {
        produced.push(ctx.create(&feed.dedup_table(), &transform(feed)).await?);
    }

    ctx.verify(STAGE, &checks(&ctx.config)).await?;
    Ok(produced)
}

/// Non-empty, unique on the business key, web restricted to product posts,
/// plus any configured row counts
pub fn checks(config: &Config) -> Vec<Check> {
    let expected = &config.expectations;
    let mut checks = Vec::new();
    for (feed, rows) in [
        (Feed::Erp, expected.erp_dedup_rows),
        (Feed::Web, expected.web_dedup_rows),
        (Feed::Liaison, expected.liaison_dedup_rows),
    ] {
        let table = feed.dedup_table();
        checks.push(Check::not_empty(&table));
        checks.push(Check::unique(&table, feed.key()));
        if let Some(rows) = rows {
            checks.push(Check::row_count(&table, rows));
        }
    }
    checks.push(Check::all_satisfy(
        "web_dedup_products_only",
        &Feed::Web.dedup_table(),
        product_posts(),
    ));
    checks
}
