//! Reading committed extracts

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use extractflow_protocol::{Dataset, Schema, Value};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use crate::codec::{arrow_type, decode_batch, FINGERPRINT_METADATA_KEY, SCHEMA_METADATA_KEY};
use crate::error::{ExtractError, Result};

/// A fully-read extract.
#[derive(Debug, Clone, PartialEq)]
pub struct Extract {
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
}

impl Extract {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Rows as a dataset in schema column order.
    pub fn to_dataset(&self) -> extractflow_protocol::Result<Dataset> {
        let mut dataset = Dataset::new(self.schema.column_names().map(str::to_string).collect());
        for row in &self.rows {
            dataset.push_row(row.clone())?;
        }
        Ok(dataset)
    }
}

/// Header information, read without decoding row data.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSummary {
    pub path: PathBuf,
    pub schema: Schema,
    pub num_rows: usize,
    pub fingerprint: String,
    pub size_bytes: u64,
}

/// What a path holds before a build.
#[derive(Debug, Clone, PartialEq)]
pub enum ExistingExtract {
    Absent,
    Committed(Schema),
    /// Something is there but it is not a readable extract.
    Unreadable { reason: String },
}

impl ExistingExtract {
    pub fn is_absent(&self) -> bool {
        matches!(self, ExistingExtract::Absent)
    }
}

/// Look at `path` without modifying it.
pub fn probe_extract(path: &Path) -> Result<ExistingExtract> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            return Ok(ExistingExtract::Unreadable {
                reason: "path is a directory".to_string(),
            })
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ExistingExtract::Absent),
        Err(err) => return Err(ExtractError::io(path, "inspect", err)),
    }

    match read_schema(path) {
        Ok(schema) => Ok(ExistingExtract::Committed(schema)),
        Err(ExtractError::Format { message, .. }) => {
            Ok(ExistingExtract::Unreadable { reason: message })
        }
        Err(err) => Err(err),
    }
}

/// Open an extract and validate its embedded schema.
pub(crate) fn open_extract(path: &Path) -> Result<(Schema, ParquetRecordBatchReaderBuilder<File>)> {
    let file = File::open(path).map_err(|err| ExtractError::io(path, "open", err))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|err| ExtractError::format(path, err.to_string()))?;

    let metadata = builder.metadata().file_metadata().key_value_metadata();
    let lookup = |key: &str| {
        metadata.and_then(|kv| {
            kv.iter()
                .find(|entry| entry.key == key)
                .and_then(|entry| entry.value.clone())
        })
    };

    let schema_json = lookup(SCHEMA_METADATA_KEY)
        .ok_or_else(|| ExtractError::format(path, "missing extract schema metadata"))?;
    let schema: Schema = serde_json::from_str(&schema_json)
        .map_err(|err| ExtractError::format(path, format!("invalid schema metadata: {}", err)))?;

    if let Some(stored) = lookup(FINGERPRINT_METADATA_KEY) {
        if stored != schema.fingerprint() {
            return Err(ExtractError::format(path, "schema fingerprint mismatch"));
        }
    }

    let fields = builder.schema().fields();
    if fields.len() != schema.len() {
        return Err(ExtractError::format(
            path,
            format!(
                "file has {} columns, schema metadata has {}",
                fields.len(),
                schema.len()
            ),
        ));
    }
    for (field, column) in fields.iter().zip(schema.columns()) {
        if field.name() != &column.name || field.data_type() != &arrow_type(column.column_type) {
            return Err(ExtractError::format(
                path,
                format!(
                    "column '{}' stored as {} {}, schema says {}",
                    column.name,
                    field.name(),
                    field.data_type(),
                    column.column_type
                ),
            ));
        }
    }

    Ok((schema, builder))
}

pub(crate) fn batch_reader(
    path: &Path,
    builder: ParquetRecordBatchReaderBuilder<File>,
) -> Result<ParquetRecordBatchReader> {
    builder
        .build()
        .map_err(|err| ExtractError::format(path, err.to_string()))
}

/// Iterate the committed batches of an extract.
pub(crate) fn read_batches(path: &Path) -> Result<(Schema, Vec<RecordBatch>)> {
    let (schema, builder) = open_extract(path)?;
    let batches = batch_reader(path, builder)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| ExtractError::format(path, err.to_string()))?;
    Ok((schema, batches))
}

/// Read only the schema of an extract.
pub fn read_schema(path: &Path) -> Result<Schema> {
    open_extract(path).map(|(schema, _)| schema)
}

/// Read an extract's schema and every row.
pub fn read_extract(path: &Path) -> Result<Extract> {
    let (schema, batches) = read_batches(path)?;
    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(decode_batch(&schema, batch, path)?);
    }
    Ok(Extract { schema, rows })
}

/// Schema, row count and fingerprint of an extract.
pub fn inspect_extract(path: &Path) -> Result<ExtractSummary> {
    let (schema, builder) = open_extract(path)?;
    let num_rows = builder.metadata().file_metadata().num_rows().max(0) as usize;
    let size_bytes = fs::metadata(path)
        .map_err(|err| ExtractError::io(path, "inspect", err))?
        .len();
    let fingerprint = schema.fingerprint();
    Ok(ExtractSummary {
        path: path.to_path_buf(),
        schema,
        num_rows,
        fingerprint,
        size_bytes,
    })
}
