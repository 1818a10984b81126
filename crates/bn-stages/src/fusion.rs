//! Fusion: three-way inner join of the deduplicated feeds

use crate::context::StageContext;
use crate::error::StageResult;
use crate::tables::{self, Feed};
use bn_check::Check;
use bn_core::{Config, Expr, JoinClause, JoinInput, Predicate, Projection, ScalarQuery, Transform};
use bn_db::TableInfo;

pub const STAGE: &str = "fusion";

const ERP_COLUMNS: [&str; 5] = [
    "product_id",
    "onsale_web",
    "price",
    "stock_quantity",
    "stock_status",
];

const WEB_COLUMNS: [&str; 6] = [
    "post_title",
    "post_excerpt",
    "post_status",
    "post_type",
    "average_rating",
    "total_sales",
];

/// Columns downstream stages rely on
const REQUIRED_COLUMNS: [&str; 4] = ["product_id", "price", "stock_status", "post_title"];

/// `erp_dedup e JOIN liaison_dedup l ON product_id JOIN web_dedup w ON l.id_web = w.sku`
pub fn transform() -> Transform {
    let columns = ERP_COLUMNS
        .iter()
        .map(|c| Projection::qualified("e", c))
        .chain(WEB_COLUMNS.iter().map(|c| Projection::qualified("w", c)))
        .collect();

    Transform::Join {
        base: JoinInput::new(Feed::Erp.dedup_table(), "e"),
        joins: vec![
            JoinClause {
                input: JoinInput::new(Feed::Liaison.dedup_table(), "l"),
                left: Expr::qcol("e", "product_id"),
                right: Expr::qcol("l", "product_id"),
            },
            JoinClause {
                input: JoinInput::new(Feed::Web.dedup_table(), "w"),
                left: Expr::qcol("l", "id_web"),
                right: Expr::qcol("w", "sku"),
            },
        ],
        columns,
    }
}

/// Liaison rows whose product and web identifiers both resolve. With unique
/// keys on both sides this is exactly the join's cardinality.
pub fn resolvable_links() -> ScalarQuery {
    ScalarQuery::count_where(
        &Feed::Liaison.dedup_table(),
        Predicate::in_table("product_id", Feed::Erp.dedup_table(), "product_id").and(
            Predicate::in_table("id_web", Feed::Web.dedup_table(), "sku"),
        ),
    )
}

pub async fn run(ctx: &StageContext) -> StageResult<TableInfo> {
    let dedup: Vec<_> = Feed::ALL.iter().map(|f| f.dedup_table()).collect();
    ctx.require_tables(STAGE, &dedup).await?;

    let info = ctx.create(&tables::fusion(), &transform()).await?;
    ctx.verify(STAGE, &checks(&ctx.config)).await?;
    ctx.export(&tables::fusion()).await?;
    Ok(info)
}

pub fn checks(config: &Config) -> Vec<Check> {
    let fusion = tables::fusion();
    let mut checks = vec![
        Check::columns_present(&fusion, &REQUIRED_COLUMNS),
        Check::not_empty(&fusion),
        Check::row_count_matches("fusion_join_cardinality", &fusion, resolvable_links()),
    ];
    if let Some(rows) = config.expectations.fusion_rows {
        checks.push(Check::row_count(&fusion, rows));
    }
    checks
}
