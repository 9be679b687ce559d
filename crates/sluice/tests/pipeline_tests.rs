//! End-to-end tests for the pipeline over real files.

use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

use sluice::{
    Aggregate, DataType, EtlError, FieldRule, Format, KeepPolicy, MissingStrategy,
    NormalizeMethod, Pipeline, PipelineStatus, Schema, Value,
};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

/// Route pipeline logs through the test harness; `RUST_LOG=debug cargo
/// test` shows them per test.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Extraction
// =============================================================================

#[test]
fn test_extract_csv_types_and_counts() {
    let file = create_test_file("id,name,score\n1,alice,1.5\n2,bob,2.5\n", ".csv");

    let mut pipeline = Pipeline::new();
    pipeline.extract(file.path(), None).expect("extract failed");

    let table = pipeline.table().unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_names(), vec!["id", "name", "score"]);
    assert_eq!(table.get(0, "id"), Some(&Value::Int(1)));
    assert_eq!(table.get(1, "score"), Some(&Value::Float(2.5)));
    assert_eq!(pipeline.stats().total_records, 2);
}

#[test]
fn test_extract_records_provenance() {
    let file = create_test_file("a,b\n1,2\n", ".csv");

    let mut pipeline = Pipeline::new();
    pipeline.extract(file.path(), None).expect("extract failed");

    let info = pipeline.source_info().expect("no provenance recorded");
    assert!(info.hash.starts_with("sha256:"));
    assert_eq!(info.format, Format::Csv);
    assert_eq!(info.row_count, 1);
    assert_eq!(info.column_count, 2);
    assert!(info.size_bytes > 0);
}

#[test]
fn test_extract_format_hint_overrides_suffix() {
    let file = create_test_file("a,b\n1,2\n", ".txt");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), Some(Format::Csv))
        .expect("extract with hint failed");
    assert_eq!(pipeline.table().unwrap().row_count(), 1);
}

#[test]
fn test_extract_unsupported_format_names_supported_set() {
    let file = create_test_file("a,b\n1,2\n", ".parquet");

    let mut pipeline = Pipeline::new();
    let err = pipeline.extract(file.path(), None).unwrap_err();
    match err {
        EtlError::UnsupportedFormat(_) => {
            let message = err.to_string();
            assert!(message.contains("csv"));
            assert!(message.contains("json"));
        }
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
}

#[test]
fn test_extract_missing_file_is_io_error() {
    let mut pipeline = Pipeline::new();
    let err = pipeline
        .extract("definitely/not/here.csv", None)
        .unwrap_err();
    assert!(matches!(err, EtlError::Io { .. }));
}

#[test]
fn test_extract_json_records() {
    let file = create_test_file(
        r#"[{"id": 1, "name": "alice"}, {"id": 2, "name": "bob", "extra": true}]"#,
        ".json",
    );

    let mut pipeline = Pipeline::new();
    pipeline.extract(file.path(), None).expect("extract failed");

    let table = pipeline.table().unwrap();
    assert_eq!(table.column_names(), vec!["id", "name", "extra"]);
    assert_eq!(table.get(0, "extra"), Some(&Value::Null));
    assert_eq!(table.get(1, "extra"), Some(&Value::Bool(true)));
}

// =============================================================================
// Scenario: duplicate users
// =============================================================================

#[test]
fn test_dedup_scenario_keeps_first_and_counts() {
    let file = create_test_file(
        "id,email\n\
         1,a@x.com\n\
         1,a@x.com\n\
         2,b@x.com\n",
        ".csv",
    );

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .remove_duplicates(None, KeepPolicy::First)
        .unwrap();

    assert_eq!(pipeline.table().unwrap().row_count(), 2);
    assert_eq!(pipeline.stats().duplicates_removed, 1);
    assert_eq!(pipeline.stats().transformations_applied, 1);
}

// =============================================================================
// Full chained runs
// =============================================================================

#[test]
fn test_full_chain_with_validation_and_load() {
    init_logging();
    let input = create_test_file(
        "user_id,email,age\n\
         1,a@x.com,30\n\
         1,a@x.com,30\n\
         2,bad-email,na\n\
         3,c@x.com,45\n",
        ".csv",
    );
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("clean.json");
    let stats_path = out_dir.path().join("stats.json");

    let schema = Schema::new()
        .with_field(
            "email",
            vec![
                FieldRule::Type {
                    expected: DataType::String,
                },
                FieldRule::Email,
            ],
        )
        .with_field(
            "age",
            vec![FieldRule::Numeric {
                min: Some(0.0),
                max: Some(150.0),
            }],
        );

    let mut pipeline = Pipeline::new();
    pipeline.run();
    pipeline
        .extract(input.path(), None)
        .unwrap()
        .remove_duplicates(None, KeepPolicy::First)
        .unwrap()
        .handle_missing_values(MissingStrategy::Fill, Some(&Value::Int(0)))
        .unwrap()
        .rename_columns(&[("user_id", "id")])
        .unwrap()
        .validate(&schema)
        .unwrap()
        .load(&output, None)
        .unwrap();
    pipeline.finish(None);
    pipeline.save_stats(&stats_path).unwrap();

    let stats = pipeline.stats();
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.duplicates_removed, 1);
    assert_eq!(stats.missing_values_handled, 1);
    assert_eq!(stats.transformations_applied, 3);
    assert_eq!(stats.valid_records, 2);
    assert_eq!(stats.invalid_records, 1);
    assert_eq!(stats.status, PipelineStatus::Completed);
    assert!(stats.execution_time >= 0.0);

    // The report names the failing row and rule.
    let report = pipeline.validation_report().unwrap();
    assert_eq!(report.row_errors.len(), 1);
    assert_eq!(report.row_errors[0].row, 1);
    assert!(report.row_errors[0].errors[0].contains("invalid email"));

    // Output and stats documents landed on disk.
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"id\""));
    let stats_doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&stats_path).unwrap()).unwrap();
    assert_eq!(stats_doc["duplicates_removed"], 1);
    assert_eq!(stats_doc["status"], "completed");
}

#[test]
fn test_aggregate_scenario_three_departments() {
    let file = create_test_file(
        "dept,salary\n\
         eng,100\n\
         sales,50\n\
         eng,200\n\
         ops,80\n\
         sales,70\n",
        ".csv",
    );

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .aggregate_data(&["dept"], &[("salary", Aggregate::Mean)])
        .unwrap();

    let table = pipeline.table().unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_names(), vec!["dept", "salary_mean"]);
    assert_eq!(table.get(0, "dept"), Some(&Value::from("eng")));
    assert_eq!(table.get(0, "salary_mean"), Some(&Value::Float(150.0)));
}

#[test]
fn test_normalize_and_calculated_column_chain() {
    let file = create_test_file("x\n10\n20\n30\n", ".csv");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .normalize_column("x", NormalizeMethod::MinMax)
        .unwrap()
        .add_calculated_column("x_pct", |row| {
            match row.get("x").and_then(Value::as_f64) {
                Some(v) => Value::Float(v * 100.0),
                None => Value::Null,
            }
        })
        .unwrap();

    let table = pipeline.table().unwrap();
    assert_eq!(table.get(1, "x"), Some(&Value::Float(0.5)));
    assert_eq!(table.get(2, "x_pct"), Some(&Value::Float(100.0)));
    assert_eq!(pipeline.stats().transformations_applied, 2);
}

// =============================================================================
// Round-trips
// =============================================================================

#[test]
fn test_csv_round_trip_preserves_nulls() {
    let file = create_test_file("a,b\n1,x\n,y\n3,\n", ".csv");
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("roundtrip.csv");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .load(&output, None)
        .unwrap();
    let original = pipeline.table().unwrap().clone();

    let mut reread = Pipeline::new();
    reread.extract(&output, None).unwrap();
    assert_eq!(reread.table().unwrap(), &original);
    assert_eq!(reread.table().unwrap().get(1, "a"), Some(&Value::Null));
}

#[test]
fn test_json_round_trip_preserves_order_and_types() {
    let file = create_test_file(
        r#"[{"z": 1, "a": 2.5, "m": true, "s": "x", "n": null}]"#,
        ".json",
    );
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("roundtrip.json");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .load(&output, None)
        .unwrap();
    let original = pipeline.table().unwrap().clone();

    let mut reread = Pipeline::new();
    reread.extract(&output, None).unwrap();
    assert_eq!(reread.table().unwrap(), &original);
    assert_eq!(
        reread.table().unwrap().column_names(),
        vec!["z", "a", "m", "s", "n"]
    );
}

#[test]
fn test_cross_format_csv_to_json() {
    let file = create_test_file("id,name\n1,alice\n2,bob\n", ".csv");
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("out.json");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(file.path(), None)
        .unwrap()
        .load(&output, None)
        .unwrap();

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[1]["name"], "bob");
}

// =============================================================================
// Stats persistence
// =============================================================================

#[test]
fn test_save_stats_creates_parent_directories() {
    let file = create_test_file("a\n1\n", ".csv");
    let out_dir = TempDir::new().unwrap();
    let nested = out_dir.path().join("reports/2024/stats.json");

    let mut pipeline = Pipeline::new();
    pipeline.run();
    pipeline.extract(file.path(), None).unwrap();
    pipeline.finish(Some(0.5));
    pipeline.save_stats(&nested).unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&nested).unwrap()).unwrap();
    assert_eq!(doc["total_records"], 1);
    assert_eq!(doc["execution_time"], 0.5);
    assert_eq!(doc["status"], "completed");
    assert!(doc["start_time"].is_string());
}

#[test]
fn test_load_unsupported_format() {
    let file = create_test_file("a\n1\n", ".csv");
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("out.xml");

    let mut pipeline = Pipeline::new();
    pipeline.extract(file.path(), None).unwrap();
    let err = pipeline.load(&output, None).unwrap_err();
    assert!(matches!(err, EtlError::UnsupportedFormat(_)));
    // The table survives the failed load.
    assert_eq!(pipeline.table().unwrap().row_count(), 1);
}
