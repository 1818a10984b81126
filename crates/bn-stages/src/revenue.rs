//! Revenue per product and in total

use crate::context::StageContext;
use crate::error::{StageError, StageResult};
use crate::tables;
use bn_check::Check;
use bn_core::{
    AggFunc, CompareOp, Config, Expr, OrderKey, Predicate, Projection, ScalarQuery, Source,
    TableName, Transform, Value,
};

pub const STAGE: &str = "revenue";

/// Per-product revenue column
pub const REVENUE_COLUMN: &str = "chiffre_affaires";
/// Grand total column of the single-row total table
pub const TOTAL_COLUMN: &str = "ca_total";

/// Outcome of the revenue stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Revenue {
    pub products: u64,
    pub total: f64,
}

/// Round half away from zero to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `price * quantity`, rounded to cents, for every fusion row with a
/// positive quantity and a price
pub fn per_product(quantity: &str) -> Transform {
    Transform::Project {
        source: Source::from(tables::fusion()),
        columns: vec![
            Projection::column("product_id"),
            Projection::column("post_title"),
            Projection::column("price"),
            Projection::column(quantity),
            Projection::named(
                Expr::col("price").mul(Expr::col(quantity)).round(2),
                REVENUE_COLUMN,
            ),
        ],
        filter: Some(
            Predicate::all_not_null(&["price", quantity]).and(Predicate::gt(quantity, 0)),
        ),
        order_by: vec![OrderKey::asc("product_id")],
    }
}

fn revenue_sum(source: &TableName, column: &str) -> ScalarQuery {
    ScalarQuery::aggregate(source, AggFunc::Sum, Expr::col(column))
}

pub async fn run(ctx: &StageContext) -> StageResult<Revenue> {
    let fusion = tables::fusion();
    ctx.require_tables(STAGE, &[fusion.clone()]).await?;

    let quantity = ctx.config.revenue.quantity_column.as_str();
    let columns = ctx.db.column_names(&fusion).await?;
    if !columns.iter().any(|c| c == quantity) {
        return Err(StageError::missing(
            STAGE,
            format!("column {} in table {}", quantity, fusion),
        ));
    }

    let per_product_table = tables::revenue_per_product();
    let info = ctx.create(&per_product_table, &per_product(quantity)).await?;

    let sum = ctx
        .db
        .scalar_f64(&revenue_sum(&per_product_table, REVENUE_COLUMN))
        .await?
        .unwrap_or(0.0);
    let total = round_cents(sum);
    ctx.create(
        &tables::revenue_total(),
        &Transform::Values {
            columns: vec![TOTAL_COLUMN.to_string()],
            rows: vec![vec![Value::Float(total)]],
        },
    )
    .await?;
    log::info!("revenue products={} total={:.2}", info.rows, total);

    ctx.verify(STAGE, &checks(&ctx.config)).await?;
    ctx.export(&per_product_table).await?;
    ctx.export(&tables::revenue_total()).await?;

    Ok(Revenue {
        products: info.rows,
        total,
    })
}

/// No null field, no negative revenue, per-product sum equal to the total,
/// plus configured oracles
pub fn checks(config: &Config) -> Vec<Check> {
    let per_product_table = tables::revenue_per_product();
    let total_table = tables::revenue_total();
    let quantity = config.revenue.quantity_column.as_str();

    let mut checks = vec![
        Check::not_empty(&per_product_table),
        Check::not_null(
            &per_product_table,
            &["product_id", "post_title", "price", quantity, REVENUE_COLUMN],
        ),
        Check::all_satisfy(
            "non_negative_revenue",
            &per_product_table,
            Predicate::compare(Expr::col(REVENUE_COLUMN), CompareOp::GtEq, Expr::lit(0)),
        ),
        Check::row_count(&total_table, 1),
        Check::values_match(
            "revenue_sum_equals_total",
            &total_table,
            revenue_sum(&per_product_table, REVENUE_COLUMN),
            revenue_sum(&total_table, TOTAL_COLUMN),
            2,
        ),
    ];
    if let Some(rows) = config.expectations.revenue_rows {
        checks.push(Check::row_count(&per_product_table, rows));
    }
    if let Some(total) = config.expectations.revenue_total {
        checks.push(Check::value_equals(
            "revenue_total_expected",
            &total_table,
            revenue_sum(&total_table, TOTAL_COLUMN),
            total,
            2,
        ));
    }
    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(387837.604), 387837.6);
        assert_eq!(round_cents(0.125), 0.13);
        assert_eq!(round_cents(0.0), 0.0);
    }

    #[test]
    fn test_per_product_filters_on_quantity() {
        let Transform::Project { filter, .. } = per_product("stock_quantity") else {
            panic!("expected projection");
        };
        let filter = filter.unwrap();
        assert!(matches!(&filter, Predicate::And(parts) if parts.contains(&Predicate::gt("stock_quantity", 0))));
    }
}
