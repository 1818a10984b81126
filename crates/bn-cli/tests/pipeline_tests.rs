//! Integration tests for Bottleneck, driven by the fixture project

use bn_core::{Config, RunState, RunStatus, StepStatus};
use bn_db::{Database, DuckDbBackend};
use bn_stages::tables::{self, Feed};
use bn_stages::{clean, dedup, fusion, revenue, zscore};
use bn_stages::{run_pipeline, LocalBlobStore, StageContext};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

const FIXTURE: &str = "tests/fixtures/project";

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), target).unwrap();
        }
    }
}

/// A private copy of the fixture project
fn fixture_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(Path::new(FIXTURE), dir.path());
    dir
}

async fn context(root: &Path, config: Config) -> StageContext {
    let blob = LocalBlobStore::new(config.blob_root(root));
    blob.create_bucket(&config.blob_store.bucket).await.unwrap();
    let db = DuckDbBackend::new(&config.database_location(root)).unwrap();
    StageContext::new(config, root, Arc::new(db), Arc::new(blob))
}

fn bn(root: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_bn"))
        .arg("--project-dir")
        .arg(root)
        .args(args)
        .env_remove("BN_CONFIG")
        .env_remove("BN_DATABASE")
        .output()
        .unwrap()
}

#[test]
fn test_fixture_config_loads() {
    let config = Config::load_from_dir(Path::new(FIXTURE)).unwrap();
    assert_eq!(config.name, "fixture_catalog");
    assert_eq!(config.expectations.fusion_rows, Some(8));
    assert_eq!(config.revenue.quantity_column, "stock_quantity");
}

#[tokio::test]
async fn test_pipeline_meets_fixture_expectations() {
    let dir = fixture_project();
    let config = Config::load_from_dir(dir.path()).unwrap();
    let ctx = context(dir.path(), config).await;

    let state = run_pipeline(&ctx).await.unwrap();
    assert_eq!(state.status, RunStatus::Completed, "{:?}", state.failed_steps());

    assert_eq!(ctx.db.row_count(&tables::fusion()).await.unwrap(), 8);
    assert_eq!(ctx.db.row_count(&tables::vintage()).await.unwrap(), 1);
    for file in [
        "erp_clean.csv",
        "fusion.csv",
        "ca_par_produit.csv",
        "vins_millesimes.csv",
        "vins_ordinaires.csv",
        "rapport_final.csv",
        "rapport_final.xlsx",
        "rapport_final.json",
    ] {
        assert!(ctx.output_path(file).is_file(), "missing {}", file);
    }
}

#[tokio::test]
async fn test_metrics_are_idempotent() {
    let dir = fixture_project();
    let mut config = Config::load_from_dir(dir.path()).unwrap();
    config.database.path = ":memory:".to_string();
    let ctx = context(dir.path(), config).await;

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        clean::run(&ctx).await.unwrap();
        let dedup_rows: Vec<u64> = dedup::run(&ctx)
            .await
            .unwrap()
            .iter()
            .map(|t| t.rows)
            .collect();
        let fusion_rows = fusion::run(&ctx).await.unwrap().rows;
        let revenue = revenue::run(&ctx).await.unwrap();
        let vintage = zscore::run(&ctx).await.unwrap().vintage;
        outcomes.push((dedup_rows, fusion_rows, revenue, vintage));
    }
    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[0].2.total, 410.0);
}

#[tokio::test]
async fn test_dedup_boundaries() {
    let dir = fixture_project();
    let mut config = Config::load_from_dir(dir.path()).unwrap();
    config.database.path = ":memory:".to_string();
    let ctx = context(dir.path(), config).await;
    clean::run(&ctx).await.unwrap();
    dedup::run(&ctx).await.unwrap();

    let web = Feed::Web.dedup_table();
    let attachments = bn_core::ScalarQuery::count_where(
        &web,
        bn_core::Predicate::eq("post_type", "attachment"),
    );
    assert_eq!(ctx.db.scalar_i64(&attachments).await.unwrap(), 0);

    let erp = Feed::Erp.dedup_table();
    let max_status = bn_core::ScalarQuery::count_where(
        &erp,
        bn_core::Predicate::eq("product_id", 1)
            .and(bn_core::Predicate::eq("stock_status", "outofstock")),
    );
    assert_eq!(ctx.db.scalar_i64(&max_status).await.unwrap(), 1);
}

#[test]
fn test_binary_runs_the_pipeline() {
    let dir = fixture_project();

    let out = bn(dir.path(), &["create-bucket"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = bn(dir.path(), &["run"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let state = RunState::load(&dir.path().join("data/outputs/run_state.json"))
        .unwrap()
        .unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.status_of("archive-logs"), Some(StepStatus::Success));

    assert!(dir.path().join("logs/fusion.log").is_file());
    assert!(dir.path().join("blob/bottleneck/logs/fusion.log").is_file());
    assert!(dir
        .path()
        .join("blob/bottleneck/data/outputs/rapport_final.csv")
        .is_file());
    assert!(dir
        .path()
        .join("blob/bottleneck/data/outputs/rapport_final.xlsx")
        .is_file());

    let out = bn(dir.path(), &["check", "zscore"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn test_binary_exits_one_on_missing_input() {
    let dir = fixture_project();
    let out = bn(dir.path(), &["fusion"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("S001"));
}

#[test]
fn test_binary_fails_without_bucket() {
    let dir = fixture_project();
    let out = bn(dir.path(), &["--database", ":memory:", "upload-inputs"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("B001"));
}
