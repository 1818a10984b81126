use super::*;
use bn_core::{AggFunc, Expr, Predicate, Source, TableName, Transform, Value};
use bn_db::DuckDbBackend;

async fn seed(db: &DuckDbBackend, name: &str, column: &str, values: Vec<Value>) {
    db.create_table(
        &t(name),
        &Transform::Values {
            columns: vec![column.to_string()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
        },
    )
    .await
    .unwrap();
}

async fn db_with(name: &str, column: &str, values: Vec<Value>) -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    seed(&db, name, column, values).await;
    db
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int(*v)).collect()
}

fn floats(values: &[f64]) -> Vec<Value> {
    values.iter().map(|v| Value::Float(*v)).collect()
}

fn t(name: &str) -> TableName {
    TableName::new(name)
}

#[tokio::test]
async fn test_unique_pass() {
    let db = db_with("keys", "id", ints(&[1, 2, 3])).await;

    let runner = CheckRunner::new(&db);
    let result = runner.run_check(&Check::unique(&t("keys"), "id")).await;

    assert!(result.passed);
    assert_eq!(result.actual, "3 rows, 3 distinct");
}

#[tokio::test]
async fn test_unique_fail() {
    let db = db_with("keys", "id", ints(&[1, 1, 2])).await;

    let runner = CheckRunner::new(&db);
    let result = runner.run_check(&Check::unique(&t("keys"), "id")).await;

    assert!(!result.passed);
    assert!(result.error.is_none());
    assert_eq!(result.actual, "3 rows, 2 distinct");
}

#[tokio::test]
async fn test_not_empty() {
    let db = db_with("filled_t", "id", ints(&[1])).await;
    db.create_table(
        &t("empty_t"),
        &Transform::Filter {
            source: Source::Table(t("filled_t")),
            predicate: Predicate::lt("id", 0),
        },
    )
    .await
    .unwrap();

    let runner = CheckRunner::new(&db);
    assert!(!runner.run_check(&Check::not_empty(&t("empty_t"))).await.passed);
    assert!(runner.run_check(&Check::not_empty(&t("filled_t"))).await.passed);
}

#[tokio::test]
async fn test_row_count() {
    let db = db_with("rows3", "n", ints(&[0, 1, 2])).await;

    let runner = CheckRunner::new(&db);
    assert!(runner.run_check(&Check::row_count(&t("rows3"), 3)).await.passed);
    assert!(!runner.run_check(&Check::row_count(&t("rows3"), 4)).await.passed);
}

#[tokio::test]
async fn test_all_satisfy_counts_null_as_violation() {
    let db = db_with(
        "prices",
        "price",
        vec![Value::Float(1.0), Value::Null, Value::Float(2.5)],
    )
    .await;

    let check = Check::all_satisfy("positive_price", &t("prices"), Predicate::gt("price", 0.0));
    let result = CheckRunner::new(&db).run_check(&check).await;

    assert!(!result.passed);
    assert_eq!(result.actual, "1 violating rows");
}

#[tokio::test]
async fn test_columns_present() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table(
        &t("fusion"),
        &Transform::Values {
            columns: vec!["product_id".to_string(), "price".to_string()],
            rows: vec![vec![Value::Int(1), Value::Float(9.5)]],
        },
    )
    .await
    .unwrap();
    let runner = CheckRunner::new(&db);

    let ok = runner
        .run_check(&Check::columns_present(&t("fusion"), &["product_id", "price"]))
        .await;
    assert!(ok.passed);

    let missing = runner
        .run_check(&Check::columns_present(&t("fusion"), &["price", "post_title"]))
        .await;
    assert!(!missing.passed);
    assert_eq!(missing.actual, "missing [post_title]");
}

#[tokio::test]
async fn test_row_count_matches_query() {
    let db = db_with("a", "id", ints(&[1, 2])).await;
    seed(&db, "b", "id", ints(&[1, 2, 3])).await;

    let check = Check::row_count_matches(
        "a_matches_b_subset",
        &t("a"),
        ScalarQuery::count_where(&t("b"), Predicate::lt("id", 3)),
    );
    assert!(CheckRunner::new(&db).run_check(&check).await.passed);
}

#[tokio::test]
async fn test_value_equals_and_values_match() {
    let db = db_with("per_item", "amount", floats(&[0.1, 0.2])).await;
    seed(&db, "total", "amount", floats(&[0.3])).await;
    let runner = CheckRunner::new(&db);
    let sum = ScalarQuery::aggregate(&t("per_item"), AggFunc::Sum, Expr::col("amount"));
    let total = ScalarQuery::aggregate(&t("total"), AggFunc::Sum, Expr::col("amount"));

    let equals = Check::value_equals("sum", &t("per_item"), sum.clone(), 0.30, 2);
    assert!(runner.run_check(&equals).await.passed);

    let wrong = Check::value_equals("sum", &t("per_item"), sum.clone(), 0.31, 2);
    assert!(!runner.run_check(&wrong).await.passed);

    let matched = Check::values_match("sum_is_total", &t("total"), sum, total, 2);
    assert!(runner.run_check(&matched).await.passed);
}

#[tokio::test]
async fn test_missing_table_is_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = CheckRunner::new(&db)
        .run_check(&Check::not_empty(&t("nope")))
        .await;

    assert!(!result.passed);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_run_all_summary() {
    let db = db_with("keys", "id", ints(&[1, 1])).await;
    let checks = vec![
        Check::not_empty(&t("keys")),
        Check::unique(&t("keys"), "id"),
        Check::not_empty(&t("absent")),
    ];

    let (results, summary) = CheckRunner::new(&db).run_all(&checks).await;

    assert_eq!(results.len(), 3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors, 1);
    assert!(!summary.all_passed());
    assert_eq!(summary.failures.len(), 2);
    assert!(summary.to_string().starts_with("1 passed, 1 failed, 1 errors"));
}
