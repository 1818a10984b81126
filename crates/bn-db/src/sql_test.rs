use super::*;
use bn_core::{Aggregate, JoinClause, JoinInput, TableName};
use std::path::PathBuf;

#[test]
fn test_quote_ident() {
    assert_eq!(quote_ident("price"), "\"price\"");
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn test_quote_qualified() {
    assert_eq!(quote_qualified("staging.erp"), "\"staging\".\"erp\"");
    assert_eq!(quote_qualified("erp"), "\"erp\"");
}

#[test]
fn test_literals() {
    assert_eq!(literal(&Value::Null), "NULL");
    assert_eq!(literal(&Value::Bool(true)), "TRUE");
    assert_eq!(literal(&Value::Int(-3)), "-3");
    assert_eq!(literal(&Value::Float(2.0)), "CAST(2.0 AS DOUBLE)");
    assert_eq!(literal(&Value::from("l'été")), "'l''été'");
}

#[test]
fn test_negation_is_null_safe() {
    let p = Predicate::gt("price", 0).negate();
    assert_eq!(predicate(&p), "NOT COALESCE((\"price\" > 0), FALSE)");
}

#[test]
fn test_conjunction_is_parenthesized() {
    let p = Predicate::any([Predicate::is_null("a"), Predicate::eq("b", 1)]);
    assert_eq!(predicate(&p), "(\"a\" IS NULL OR \"b\" = 1)");
}

#[test]
fn test_finite_casts_to_double() {
    assert_eq!(
        predicate(&Predicate::finite("price")),
        "isfinite(CAST(\"price\" AS DOUBLE))"
    );
}

#[test]
fn test_csv_source() {
    let src = Source::Csv(PathBuf::from("/data/o'neil.csv"));
    assert_eq!(source(&src), "read_csv_auto('/data/o''neil.csv')");
}

#[test]
fn test_aggregate_select() {
    let sql = select(&Transform::Aggregate {
        source: Source::from(TableName::new("erp_clean")),
        filter: None,
        group_by: vec!["product_id".to_string()],
        aggregates: vec![Aggregate::same_name(AggFunc::Max, "price")],
    });
    assert_eq!(
        sql,
        "SELECT \"product_id\", MAX(\"price\") AS \"price\" FROM \"erp_clean\" GROUP BY \"product_id\""
    );
}

#[test]
fn test_rank_select_excludes_helper_column() {
    let sql = select(&Transform::Rank {
        source: Source::from(TableName::new("web_clean")),
        filter: Some(Predicate::eq("post_type", "product")),
        partition_by: vec!["sku".to_string()],
        order_by: vec![OrderKey::desc("post_date")],
        keep: 1,
    });
    assert!(sql.starts_with("SELECT * EXCLUDE (\"__rank\")"));
    assert!(sql.contains("PARTITION BY \"sku\" ORDER BY \"post_date\" DESC"));
    assert!(sql.contains("WHERE \"post_type\" = 'product'"));
    assert!(sql.ends_with("WHERE \"__rank\" <= 1"));
}

#[test]
fn test_join_select() {
    let sql = select(&Transform::Join {
        base: JoinInput::new(TableName::new("erp_dedup"), "e"),
        joins: vec![JoinClause {
            input: JoinInput::new(TableName::new("liaison_dedup"), "l"),
            left: Expr::qcol("e", "product_id"),
            right: Expr::qcol("l", "product_id"),
        }],
        columns: vec![Projection::qualified("e", "product_id")],
    });
    assert_eq!(
        sql,
        "SELECT \"e\".\"product_id\" FROM \"erp_dedup\" AS \"e\" JOIN \"liaison_dedup\" AS \"l\" ON \"e\".\"product_id\" = \"l\".\"product_id\""
    );
}

#[test]
fn test_scalar_with_filter() {
    let q = ScalarQuery::count_where(TableName::new("fusion"), Predicate::not_null("price"));
    assert_eq!(
        scalar(&q),
        "SELECT COUNT(*) FROM \"fusion\" WHERE \"price\" IS NOT NULL"
    );
    assert_eq!(
        cast_scalar(&scalar(&q), "BIGINT"),
        "SELECT CAST(v AS BIGINT) FROM (SELECT COUNT(*) FROM \"fusion\" WHERE \"price\" IS NOT NULL) AS q(v)"
    );
}

#[test]
fn test_values_select() {
    let sql = select(&Transform::Values {
        columns: vec!["metric".to_string(), "value".to_string()],
        rows: vec![vec![Value::from("Fusion"), Value::from(2)]],
    });
    assert_eq!(
        sql,
        "SELECT * FROM (VALUES ('Fusion', 2)) AS v(\"metric\", \"value\")"
    );
}
