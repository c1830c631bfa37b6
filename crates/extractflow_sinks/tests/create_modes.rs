//! Create-mode behaviour against real files.
//!
//! Every failure case checks the committed file independently before and
//! after the failing call.

use std::fs;
use std::path::Path;

use extractflow_protocol::{ColumnDef, ColumnType, CreateMode, Dataset, Row, Schema, TableName, Value};
use extractflow_schema::SchemaBuilder;
use extractflow_sinks::{
    inspect_extract, probe_extract, read_extract, write_csv_snapshot, ExistingExtract,
    ExtractError, ExtractWriter,
};
use tempfile::TempDir;

fn orders(ids: &[i64]) -> Dataset {
    Dataset::from_rows(
        ids.iter()
            .map(|id| {
                Row::new()
                    .with("id", *id)
                    .with("city", format!("city-{}", id))
            })
            .collect(),
    )
    .unwrap()
}

fn build(path: &Path, mode: CreateMode, dataset: &Dataset) -> Result<usize, ExtractError> {
    let schema = SchemaBuilder::default().build(dataset).unwrap();
    let mut writer = ExtractWriter::open(path)?;
    writer
        .write(mode, &schema, dataset)
        .map(|report| report.total_rows)
}

fn temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

#[test]
fn test_end_to_end_extract_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");
    let dataset = Dataset::from_columns(vec![
        ("id", vec![Value::Integer(1), Value::Integer(2)]),
        ("city", vec![Value::from("NYC"), Value::Null]),
        (
            "orderDate",
            vec![Value::from("2023-01-01"), Value::from("2023-01-02")],
        ),
    ])
    .unwrap();

    build(&path, CreateMode::AndReplace, &dataset).unwrap();

    let extract = read_extract(&path).unwrap();
    assert_eq!(
        extract.schema.columns(),
        &[
            ColumnDef::new("id", ColumnType::Integer),
            ColumnDef::new("city", ColumnType::Text),
            ColumnDef::new("orderDate", ColumnType::Date),
        ]
    );
    assert_eq!(extract.rows.len(), 2);
    assert_eq!(extract.rows[1][1], Value::Null);
    assert_eq!(
        extract.rows[1][2],
        Value::Date(chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
    );
}

#[test]
fn test_create_only_exclusivity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");

    build(&path, CreateMode::Only, &orders(&[1, 2])).unwrap();
    let before = read_extract(&path).unwrap();
    let bytes_before = fs::read(&path).unwrap();

    let err = build(&path, CreateMode::Only, &orders(&[7, 8, 9])).unwrap_err();
    assert!(matches!(err, ExtractError::AlreadyExists { .. }));

    assert_eq!(read_extract(&path).unwrap(), before);
    assert_eq!(fs::read(&path).unwrap(), bytes_before);
    assert!(temp_files(dir.path()).is_empty());
}

#[test]
fn test_append_schema_gate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");
    build(&path, CreateMode::AndReplace, &orders(&[1, 2, 3])).unwrap();
    let before = read_extract(&path).unwrap();

    let different = Dataset::from_rows(vec![Row::new().with("id", 4i64).with("amount", 2.5)])
        .unwrap();
    for mode in [CreateMode::AndAppend, CreateMode::OrAppend] {
        let err = build(&path, mode, &different).unwrap_err();
        match err {
            ExtractError::SchemaMismatch { detail, .. } => assert!(detail.contains("amount")),
            other => panic!("unexpected error: {other}"),
        }
    }

    let after = read_extract(&path).unwrap();
    assert_eq!(after.num_rows(), 3);
    assert_eq!(after, before);
}

#[test]
fn test_append_adds_rows_after_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");
    build(&path, CreateMode::OrAppend, &orders(&[1, 2])).unwrap();
    let total = build(&path, CreateMode::AndAppend, &orders(&[3])).unwrap();
    assert_eq!(total, 3);

    let ids: Vec<Value> = read_extract(&path)
        .unwrap()
        .rows
        .into_iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(
        ids,
        vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
    );
}

#[test]
fn test_and_append_requires_existing_extract() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.extract");
    let err = build(&path, CreateMode::AndAppend, &orders(&[1])).unwrap_err();
    assert!(matches!(err, ExtractError::MissingExtract { .. }));
    assert!(!path.exists());
}

#[test]
fn test_replace_discards_different_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");
    build(&path, CreateMode::OrReplace, &orders(&[1, 2, 3])).unwrap();

    let other = Dataset::from_rows(vec![Row::new().with("amount", 9.5)]).unwrap();
    build(&path, CreateMode::AndReplace, &other).unwrap();

    let extract = read_extract(&path).unwrap();
    assert_eq!(extract.schema.column_names().collect::<Vec<_>>(), vec!["amount"]);
    assert_eq!(extract.rows, vec![vec![Value::Float(9.5)]]);
}

#[test]
fn test_non_extract_file_handling() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.extract");
    fs::write(&path, "just some text").unwrap();

    assert!(matches!(
        probe_extract(&path).unwrap(),
        ExistingExtract::Unreadable { .. }
    ));

    let err = build(&path, CreateMode::Only, &orders(&[1])).unwrap_err();
    assert!(matches!(err, ExtractError::AlreadyExists { .. }));
    let err = build(&path, CreateMode::OrAppend, &orders(&[1])).unwrap_err();
    assert!(matches!(err, ExtractError::Format { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "just some text");

    build(&path, CreateMode::OrReplace, &orders(&[1])).unwrap();
    assert_eq!(read_extract(&path).unwrap().num_rows(), 1);
}

#[test]
fn test_zero_row_dataset_builds_empty_extract() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.extract");
    let schema = Schema::try_new(
        TableName::default(),
        vec![ColumnDef::new("id", ColumnType::Integer)],
    )
    .unwrap();
    let dataset = Dataset::new(vec!["id".to_string()]);

    let mut writer = ExtractWriter::open(&path).unwrap();
    let report = writer.write(CreateMode::Only, &schema, &dataset).unwrap();
    assert_eq!(report.total_rows, 0);

    let summary = inspect_extract(&path).unwrap();
    assert_eq!(summary.num_rows, 0);
    assert_eq!(summary.schema, schema);
    assert_eq!(summary.fingerprint, schema.fingerprint());
}

#[test]
fn test_inspect_reports_rows_and_fingerprint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.extract");
    build(&path, CreateMode::OrReplace, &orders(&[1, 2, 3, 4])).unwrap();

    let summary = inspect_extract(&path).unwrap();
    assert_eq!(summary.num_rows, 4);
    assert!(summary.size_bytes > 0);
    assert_eq!(summary.fingerprint.len(), 64);
}

#[test]
fn test_snapshot_and_extract_side_by_side() {
    let dir = TempDir::new().unwrap();
    let dataset = orders(&[1, 2]);
    write_csv_snapshot(&dataset, &dir.path().join("orders.csv")).unwrap();
    build(&dir.path().join("orders.extract"), CreateMode::OrReplace, &dataset).unwrap();

    let csv = fs::read_to_string(dir.path().join("orders.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(temp_files(dir.path()).is_empty());
}
