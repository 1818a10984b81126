use super::*;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config = Config::from_yaml("name: bottleneck").unwrap();
    assert_eq!(config.name, "bottleneck");

    let root = PathBuf::from("/srv/pipeline");
    assert_eq!(config.inputs_dir(&root), root.join("data/inputs"));
    assert_eq!(config.outputs_dir(&root), root.join("data/outputs"));
    assert_eq!(config.snapshots_dir(&root), root.join("data/snapshots"));
    assert_eq!(config.logs_dir(&root), root.join("logs"));
    assert_eq!(
        config.database_location(&root),
        root.join("data/bottleneck.duckdb").display().to_string()
    );
    assert_eq!(config.blob_store.bucket, "bottleneck");
    assert_eq!(config.revenue.quantity_column, "stock_quantity");
    assert_eq!(config.zscore.threshold, 2.0);
    assert_eq!(config.zscore.deviation, Deviation::Population);
    assert_eq!(config.expectations, Expectations::default());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: bottleneck
paths:
  inputs: /data/in
  outputs: out
database:
  path: warehouse/bn.duckdb
blob_store:
  bucket: archive
  root: /mnt/minio
revenue:
  quantity_column: total_sales
zscore:
  threshold: 3.0
  deviation: sample
snapshot:
  label: after-fusion
expectations:
  erp_dedup_rows: 825
  web_dedup_rows: 714
  liaison_dedup_rows: 825
  fusion_rows: 714
  revenue_rows: 573
  revenue_total: 387837.60
  vintage_rows: 30
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let root = PathBuf::from("/srv/pipeline");
    assert_eq!(config.inputs_dir(&root), PathBuf::from("/data/in"));
    assert_eq!(config.outputs_dir(&root), root.join("out"));
    assert_eq!(config.blob_root(&root), PathBuf::from("/mnt/minio"));
    assert_eq!(config.blob_store.bucket, "archive");
    assert_eq!(config.revenue.quantity_column, "total_sales");
    assert_eq!(config.zscore.deviation, Deviation::Sample);
    assert_eq!(config.expectations.fusion_rows, Some(714));
    assert_eq!(config.expectations.revenue_total, Some(387837.60));
    assert_eq!(
        config.snapshot_path(&root),
        root.join("data/snapshots/bn_after-fusion.duckdb")
    );
}

#[test]
fn test_in_memory_database() {
    let config = Config::from_yaml("name: t\ndatabase:\n  path: \":memory:\"").unwrap();
    assert!(config.is_in_memory());
    assert_eq!(config.database_location(Path::new("/x")), ":memory:");
}

#[test]
fn test_unknown_field_rejected() {
    assert!(Config::from_yaml("name: t\nunknown: 1").is_err());
    assert!(Config::from_yaml("name: t\nzscore:\n  treshold: 2").is_err());
}

#[test]
fn test_empty_name_rejected() {
    let err = Config::from_yaml("name: \"  \"").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_invalid_threshold_rejected() {
    assert!(Config::from_yaml("name: t\nzscore:\n  threshold: 0").is_err());
    assert!(Config::from_yaml("name: t\nzscore:\n  threshold: -1.5").is_err());
    assert!(Config::from_yaml("name: t\nzscore:\n  threshold: .nan").is_err());
}

#[test]
fn test_invalid_snapshot_label_rejected() {
    assert!(Config::from_yaml("name: t\nsnapshot:\n  label: \"../x\"").is_err());
}

#[test]
fn test_negative_expected_total_rejected() {
    assert!(Config::from_yaml("name: t\nexpectations:\n  revenue_total: -1").is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bottleneck.yaml"), "name: from_dir").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_dir");
}

#[test]
fn test_load_from_dir_missing() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_with_name_is_valid() {
    let config = Config::with_name("bottleneck");
    assert!(config.validate().is_ok());
}
