//! Create-mode state machine for one extract path
//!
//! | Mode | Absent | Committed, equal schema | Committed, other schema |
//! |------|--------|-------------------------|-------------------------|
//! | `AndReplace` | fresh | fresh | fresh |
//! | `OrReplace` | fresh | fresh | fresh |
//! | `AndAppend` | `MissingExtract` | append | `SchemaMismatch` |
//! | `OrAppend` | fresh | append | `SchemaMismatch` |
//! | `Only` | fresh | `AlreadyExists` | `AlreadyExists` |
//!
//! A path holding something that is not a readable extract counts as
//! present: replace modes overwrite it, `Only` refuses it and the append
//! modes fail with a format error.
//!
//! Every build is staged and promoted with one rename, so a failure at any
//! point leaves the previous file (or its absence) as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use extractflow_protocol::{CreateMode, Dataset, Schema};
use extractflow_schema::ValueCoercer;
use tracing::{debug, info, warn};

use crate::codec::{encode_rows, BATCH_ROWS};
use crate::error::{ExtractError, Result};
use crate::reader::{probe_extract, read_batches, read_extract, ExistingExtract, Extract};
use crate::staging::ExtractStage;

/// Observable lifecycle of the extract this writer owns.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractState {
    Absent,
    Committed(Schema),
    /// Something other than an extract sits at the path. `plan` decides
    /// per mode whether a build may overwrite it.
    Unreadable { reason: String },
    Building,
    /// The last build failed; the file on disk is whatever was committed
    /// before it.
    Failed,
}

impl ExtractState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractState::Absent => "absent",
            ExtractState::Committed(_) => "committed",
            ExtractState::Unreadable { .. } => "unreadable",
            ExtractState::Building => "building",
            ExtractState::Failed => "failed",
        }
    }
}

/// What a build will do, decided before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildPlan {
    /// Write a new extract, replacing whatever is at the path.
    Fresh { replaces: bool },
    /// Rewrite the existing rows followed by the new ones, keeping the
    /// existing schema (and its table identity).
    Append { existing: Schema },
}

/// Decide the build for `mode` given what is at `path`.
pub fn plan(
    path: &Path,
    mode: CreateMode,
    existing: &ExistingExtract,
    schema: &Schema,
) -> Result<BuildPlan> {
    match (mode, existing) {
        (CreateMode::AndReplace, ExistingExtract::Absent) => {
            info!("No extract at {} to replace; creating", path.display());
            Ok(BuildPlan::Fresh { replaces: false })
        }
        (CreateMode::AndReplace | CreateMode::OrReplace, existing) => Ok(BuildPlan::Fresh {
            replaces: !existing.is_absent(),
        }),

        (CreateMode::Only, ExistingExtract::Absent) => Ok(BuildPlan::Fresh { replaces: false }),
        (CreateMode::Only, _) => Err(ExtractError::AlreadyExists {
            path: path.to_path_buf(),
        }),

        (CreateMode::AndAppend, ExistingExtract::Absent) => Err(ExtractError::MissingExtract {
            path: path.to_path_buf(),
        }),
        (CreateMode::OrAppend, ExistingExtract::Absent) => Ok(BuildPlan::Fresh { replaces: false }),
        (CreateMode::AndAppend | CreateMode::OrAppend, ExistingExtract::Unreadable { reason }) => {
            Err(ExtractError::format(path, reason.clone()))
        }
        (CreateMode::AndAppend | CreateMode::OrAppend, ExistingExtract::Committed(current)) => {
            match current.structural_diff(schema) {
                None => Ok(BuildPlan::Append {
                    existing: current.clone(),
                }),
                Some(detail) => Err(ExtractError::SchemaMismatch {
                    path: path.to_path_buf(),
                    detail,
                }),
            }
        }
    }
}

/// Outcome of a committed build.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub path: PathBuf,
    pub mode: CreateMode,
    pub plan: BuildPlan,
    /// Schema of the committed extract.
    pub schema: Schema,
    /// Rows taken from the dataset.
    pub rows_written: usize,
    /// Rows in the committed extract, including appended-to rows.
    pub total_rows: usize,
}

/// Builds and updates the extract at one path.
///
/// One writer per path at a time; nothing here locks the file.
#[derive(Debug)]
pub struct ExtractWriter {
    path: PathBuf,
    coercer: ValueCoercer,
    state: ExtractState,
}

impl ExtractWriter {
    /// Writer for `path`, with its state read from disk.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match probe_extract(&path)? {
            ExistingExtract::Committed(schema) => ExtractState::Committed(schema),
            ExistingExtract::Unreadable { reason } => ExtractState::Unreadable { reason },
            ExistingExtract::Absent => ExtractState::Absent,
        };
        Ok(Self {
            path,
            coercer: ValueCoercer::default(),
            state,
        })
    }

    pub fn with_coercer(mut self, coercer: ValueCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ExtractState {
        &self.state
    }

    pub fn read(&self) -> Result<Extract> {
        read_extract(&self.path)
    }

    /// Build the extract from `dataset` under `mode`.
    ///
    /// Precondition failures leave the state untouched. Any later failure
    /// moves the writer to [`ExtractState::Failed`] with the file on disk
    /// unchanged.
    pub fn write(
        &mut self,
        mode: CreateMode,
        schema: &Schema,
        dataset: &Dataset,
    ) -> Result<CommitReport> {
        if !dataset
            .columns()
            .iter()
            .map(String::as_str)
            .eq(schema.column_names())
        {
            return Err(ExtractError::SchemaMismatch {
                path: self.path.clone(),
                detail: format!(
                    "dataset columns {:?} do not match schema {}",
                    dataset.columns(),
                    schema
                ),
            });
        }

        let existing = probe_extract(&self.path)?;
        if let ExistingExtract::Unreadable { reason } = &existing {
            debug!("Existing file at {} is not an extract: {}", self.path.display(), reason);
        }
        let plan = plan(&self.path, mode, &existing, schema)?;
        info!(
            path = %self.path.display(),
            mode = %mode,
            plan = ?plan,
            rows = dataset.num_rows(),
            "Building extract"
        );

        self.state = ExtractState::Building;
        match self.build(&plan, schema, dataset) {
            Ok((committed, total_rows)) => {
                info!(
                    "Committed extract: {} ({} rows, {} new)",
                    self.path.display(),
                    total_rows,
                    dataset.num_rows()
                );
                self.state = ExtractState::Committed(committed.clone());
                Ok(CommitReport {
                    path: self.path.clone(),
                    mode,
                    plan,
                    schema: committed,
                    rows_written: dataset.num_rows(),
                    total_rows,
                })
            }
            Err(err) => {
                warn!("Extract build failed for {}: {}", self.path.display(), err);
                self.state = ExtractState::Failed;
                Err(err)
            }
        }
    }

    fn build(
        &self,
        plan: &BuildPlan,
        schema: &Schema,
        dataset: &Dataset,
    ) -> Result<(Schema, usize)> {
        let target = match plan {
            BuildPlan::Fresh { .. } => schema,
            BuildPlan::Append { existing } => existing,
        };
        let mut stage = ExtractStage::open(&self.path, target)?;

        if let BuildPlan::Append { .. } = plan {
            let (_, batches) = read_batches(&self.path)?;
            for batch in batches {
                let batch = RecordBatch::try_new(
                    Arc::clone(stage.arrow_schema()),
                    batch.columns().to_vec(),
                )
                .map_err(|err| ExtractError::format(&self.path, err.to_string()))?;
                stage.write_batch(&batch)?;
            }
        }

        let arrow = Arc::clone(stage.arrow_schema());
        for (chunk_idx, chunk) in dataset.rows().chunks(BATCH_ROWS).enumerate() {
            let batch = encode_rows(target, &arrow, chunk, chunk_idx * BATCH_ROWS, &self.coercer)?;
            stage.write_batch(&batch)?;
        }

        let total_rows = stage.commit()?;
        Ok((target.clone(), total_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractflow_protocol::{ColumnDef, ColumnType, TableName, Value};
    use tempfile::tempdir;

    fn schema(cols: &[(&str, ColumnType)]) -> Schema {
        Schema::try_new(
            TableName::default(),
            cols.iter().map(|(n, t)| ColumnDef::new(*n, *t)).collect(),
        )
        .unwrap()
    }

    fn ids(values: &[i64]) -> Dataset {
        Dataset::from_columns(vec![(
            "id",
            values.iter().map(|v| Value::Integer(*v)).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn test_plan_table() {
        let path = Path::new("x.extract");
        let a = schema(&[("id", ColumnType::Integer)]);
        let b = schema(&[("id", ColumnType::Text)]);
        let absent = ExistingExtract::Absent;
        let same = ExistingExtract::Committed(a.clone());
        let other = ExistingExtract::Committed(b.clone());
        let junk = ExistingExtract::Unreadable {
            reason: "bad magic".into(),
        };

        for mode in [CreateMode::AndReplace, CreateMode::OrReplace] {
            assert_eq!(
                plan(path, mode, &absent, &a).unwrap(),
                BuildPlan::Fresh { replaces: false }
            );
            assert_eq!(
                plan(path, mode, &other, &a).unwrap(),
                BuildPlan::Fresh { replaces: true }
            );
            assert_eq!(
                plan(path, mode, &junk, &a).unwrap(),
                BuildPlan::Fresh { replaces: true }
            );
        }

        assert!(matches!(
            plan(path, CreateMode::AndAppend, &absent, &a),
            Err(ExtractError::MissingExtract { .. })
        ));
        assert_eq!(
            plan(path, CreateMode::OrAppend, &absent, &a).unwrap(),
            BuildPlan::Fresh { replaces: false }
        );
        for mode in [CreateMode::AndAppend, CreateMode::OrAppend] {
            assert_eq!(
                plan(path, mode, &same, &a).unwrap(),
                BuildPlan::Append { existing: a.clone() }
            );
            assert!(matches!(
                plan(path, mode, &other, &a),
                Err(ExtractError::SchemaMismatch { .. })
            ));
            assert!(matches!(
                plan(path, mode, &junk, &a),
                Err(ExtractError::Format { .. })
            ));
        }

        assert_eq!(
            plan(path, CreateMode::Only, &absent, &a).unwrap(),
            BuildPlan::Fresh { replaces: false }
        );
        for existing in [&same, &other, &junk] {
            assert!(matches!(
                plan(path, CreateMode::Only, existing, &a),
                Err(ExtractError::AlreadyExists { .. })
            ));
        }
    }

    #[test]
    fn test_state_transitions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.extract");
        let s = schema(&[("id", ColumnType::Integer)]);

        let mut writer = ExtractWriter::open(&path).unwrap();
        assert_eq!(writer.state(), &ExtractState::Absent);

        writer.write(CreateMode::Only, &s, &ids(&[1, 2])).unwrap();
        assert_eq!(writer.state(), &ExtractState::Committed(s.clone()));

        // Precondition failure: state is not disturbed.
        let err = writer.write(CreateMode::Only, &s, &ids(&[3])).unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(writer.state().as_str(), "committed");

        let reopened = ExtractWriter::open(&path).unwrap();
        assert_eq!(reopened.state(), &ExtractState::Committed(s));
    }

    #[test]
    fn test_non_extract_file_is_its_own_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.extract");
        std::fs::write(&path, "not parquet").unwrap();
        let s = schema(&[("id", ColumnType::Integer)]);

        let mut writer = ExtractWriter::open(&path).unwrap();
        assert_eq!(writer.state().as_str(), "unreadable");

        let err = writer.write(CreateMode::Only, &s, &ids(&[1])).unwrap_err();
        assert!(matches!(err, ExtractError::AlreadyExists { .. }));
        let err = writer.write(CreateMode::OrAppend, &s, &ids(&[1])).unwrap_err();
        assert!(matches!(err, ExtractError::Format { .. }));
        assert_eq!(writer.state().as_str(), "unreadable");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not parquet");

        let report = writer.write(CreateMode::OrReplace, &s, &ids(&[1])).unwrap();
        assert_eq!(report.plan, BuildPlan::Fresh { replaces: true });
        assert_eq!(writer.state(), &ExtractState::Committed(s));
    }

    #[test]
    fn test_append_keeps_existing_table_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.extract");
        let original = Schema::try_new(
            TableName::new("Sales", "Orders"),
            vec![ColumnDef::new("id", ColumnType::Integer)],
        )
        .unwrap();
        let incoming = schema(&[("id", ColumnType::Integer)]);

        let mut writer = ExtractWriter::open(&path).unwrap();
        writer.write(CreateMode::AndReplace, &original, &ids(&[1])).unwrap();
        let report = writer.write(CreateMode::AndAppend, &incoming, &ids(&[2, 3])).unwrap();

        assert_eq!(report.schema.table(), &TableName::new("Sales", "Orders"));
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.total_rows, 3);

        let extract = writer.read().unwrap();
        let ids: Vec<Value> = extract.rows.into_iter().map(|mut r| r.remove(0)).collect();
        assert_eq!(
            ids,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn test_strict_failure_marks_failed_and_preserves_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.extract");
        let s = schema(&[("id", ColumnType::Integer)]);

        let mut writer = ExtractWriter::open(&path)
            .unwrap()
            .with_coercer(ValueCoercer::new(false, true));
        writer.write(CreateMode::OrReplace, &s, &ids(&[1, 2])).unwrap();

        let bad = Dataset::from_columns(vec![(
            "id",
            vec![Value::Integer(9), Value::from("not a number")],
        )])
        .unwrap();
        let err = writer.write(CreateMode::OrReplace, &s, &bad).unwrap_err();
        assert!(matches!(err, ExtractError::RowEncode { row: 1, .. }));
        assert_eq!(writer.state(), &ExtractState::Failed);

        assert_eq!(writer.read().unwrap().rows.len(), 2);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_dataset_must_match_schema_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.extract");
        let s = schema(&[("other", ColumnType::Integer)]);
        let mut writer = ExtractWriter::open(&path).unwrap();
        let err = writer.write(CreateMode::OrReplace, &s, &ids(&[1])).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaMismatch { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_multi_batch_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.extract");
        let s = schema(&[("id", ColumnType::Integer)]);
        let values: Vec<i64> = (0..(BATCH_ROWS as i64 * 2 + 5)).collect();

        let mut writer = ExtractWriter::open(&path).unwrap();
        let report = writer.write(CreateMode::OrReplace, &s, &ids(&values)).unwrap();
        assert_eq!(report.total_rows, values.len());

        let extract = writer.read().unwrap();
        assert_eq!(extract.rows.len(), values.len());
        assert_eq!(extract.rows.last().unwrap()[0], Value::Integer(*values.last().unwrap()));
    }
}
