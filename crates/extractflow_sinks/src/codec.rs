//! Row values ↔ Arrow record batches
//!
//! Every extract column is nullable. The extract schema itself travels in
//! the Parquet key-value metadata so a file can be read back without any
//! side information.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, Date32Builder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, RecordBatch, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use extractflow_protocol::{ColumnDef, ColumnType, Schema, Value};
use extractflow_schema::ValueCoercer;
use parquet::file::metadata::KeyValue;

use crate::error::{ExtractError, Result};

/// Parquet metadata key holding the extract schema as JSON.
pub const SCHEMA_METADATA_KEY: &str = "extractflow.schema";
/// Parquet metadata key holding the schema fingerprint.
pub const FINGERPRINT_METADATA_KEY: &str = "extractflow.fingerprint";
/// Rows per encoded record batch.
pub const BATCH_ROWS: usize = 8192;

pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Text => DataType::Utf8,
        ColumnType::Date => DataType::Date32,
    }
}

/// Arrow schema for an extract schema.
pub fn arrow_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .columns()
        .iter()
        .map(|c| Field::new(c.name.as_str(), arrow_type(c.column_type), true))
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

pub(crate) fn schema_metadata(schema: &Schema, path: &Path) -> Result<Vec<KeyValue>> {
    let json = serde_json::to_string(schema)
        .map_err(|err| ExtractError::format(path, format!("cannot serialize schema: {}", err)))?;
    Ok(vec![
        KeyValue::new(SCHEMA_METADATA_KEY.to_string(), json),
        KeyValue::new(FINGERPRINT_METADATA_KEY.to_string(), schema.fingerprint()),
    ])
}

fn unix_epoch() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.signed_duration_since(unix_epoch()).num_days() as i32
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    unix_epoch().checked_add_signed(Duration::days(i64::from(days)))
}

/// Encode `rows` as one batch. `first_row` is the dataset index of
/// `rows[0]`, used in error messages.
pub(crate) fn encode_rows(
    schema: &Schema,
    arrow: &SchemaRef,
    rows: &[Vec<Value>],
    first_row: usize,
    coercer: &ValueCoercer,
) -> Result<RecordBatch> {
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for (col_idx, column) in schema.columns().iter().enumerate() {
        let mut cells = Vec::with_capacity(rows.len());
        for (offset, row) in rows.iter().enumerate() {
            let row_idx = first_row + offset;
            let value = match row.get(col_idx) {
                Some(value) => coercer.coerce(row_idx, column, value),
                None => coercer.coerce(row_idx, column, &Value::Null),
            }
            .map_err(|err| ExtractError::RowEncode {
                row: row_idx,
                column: column.name.clone(),
                reason: err.to_string(),
            })?;
            cells.push(value);
        }
        arrays.push(build_array(column, cells, first_row)?);
    }

    RecordBatch::try_new(Arc::clone(arrow), arrays).map_err(|err| ExtractError::RowEncode {
        row: first_row,
        column: String::new(),
        reason: err.to_string(),
    })
}

fn unexpected(column: &ColumnDef, row: usize, value: &Value) -> ExtractError {
    ExtractError::RowEncode {
        row,
        column: column.name.clone(),
        reason: format!(
            "coerced {} value does not fit {} column",
            value.kind(),
            column.column_type
        ),
    }
}

fn build_array(column: &ColumnDef, cells: Vec<Value>, first_row: usize) -> Result<ArrayRef> {
    let len = cells.len();
    let array: ArrayRef = match column.column_type {
        ColumnType::Integer => {
            let mut builder = Int64Builder::with_capacity(len);
            for (offset, cell) in cells.iter().enumerate() {
                match cell {
                    Value::Integer(v) => builder.append_value(*v),
                    Value::Null => builder.append_null(),
                    other => return Err(unexpected(column, first_row + offset, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Float => {
            let mut builder = Float64Builder::with_capacity(len);
            for (offset, cell) in cells.iter().enumerate() {
                match cell {
                    Value::Float(v) => builder.append_value(*v),
                    Value::Null => builder.append_null(),
                    other => return Err(unexpected(column, first_row + offset, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Text => {
            let mut builder = StringBuilder::with_capacity(len, len * 16);
            for (offset, cell) in cells.iter().enumerate() {
                match cell {
                    Value::Text(v) => builder.append_value(v),
                    Value::Null => builder.append_null(),
                    other => return Err(unexpected(column, first_row + offset, other)),
                }
            }
            Arc::new(builder.finish())
        }
        ColumnType::Date => {
            let mut builder = Date32Builder::with_capacity(len);
            for (offset, cell) in cells.iter().enumerate() {
                match cell {
                    Value::Date(d) => builder.append_value(date_to_days(*d)),
                    Value::Null => builder.append_null(),
                    other => return Err(unexpected(column, first_row + offset, other)),
                }
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}

/// Decode a batch read from an extract back into row values.
pub(crate) fn decode_batch(
    schema: &Schema,
    batch: &RecordBatch,
    path: &Path,
) -> Result<Vec<Vec<Value>>> {
    if batch.num_columns() != schema.len() {
        return Err(ExtractError::format(
            path,
            format!(
                "batch has {} columns, schema has {}",
                batch.num_columns(),
                schema.len()
            ),
        ));
    }

    let mut rows: Vec<Vec<Value>> = (0..batch.num_rows())
        .map(|_| Vec::with_capacity(schema.len()))
        .collect();

    for (col_idx, column) in schema.columns().iter().enumerate() {
        let array = batch.column(col_idx);
        let wrong_type = || {
            ExtractError::format(
                path,
                format!(
                    "column '{}' stored as {}, expected {}",
                    column.name,
                    array.data_type(),
                    arrow_type(column.column_type)
                ),
            )
        };

        match column.column_type {
            ColumnType::Integer => {
                let values = array
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .ok_or_else(wrong_type)?;
                for (i, row) in rows.iter_mut().enumerate() {
                    row.push(if values.is_null(i) {
                        Value::Null
                    } else {
                        Value::Integer(values.value(i))
                    });
                }
            }
            ColumnType::Float => {
                let values = array
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(wrong_type)?;
                for (i, row) in rows.iter_mut().enumerate() {
                    row.push(if values.is_null(i) {
                        Value::Null
                    } else {
                        Value::Float(values.value(i))
                    });
                }
            }
            ColumnType::Text => {
                let values = array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(wrong_type)?;
                for (i, row) in rows.iter_mut().enumerate() {
                    row.push(if values.is_null(i) {
                        Value::Null
                    } else {
                        Value::Text(values.value(i).to_string())
                    });
                }
            }
            ColumnType::Date => {
                let values = array
                    .as_any()
                    .downcast_ref::<Date32Array>()
                    .ok_or_else(wrong_type)?;
                for (i, row) in rows.iter_mut().enumerate() {
                    if values.is_null(i) {
                        row.push(Value::Null);
                        continue;
                    }
                    let days = values.value(i);
                    let date = days_to_date(days).ok_or_else(|| {
                        ExtractError::format(path, format!("date out of range: {} days", days))
                    })?;
                    row.push(Value::Date(date));
                }
            }
        }
    }

    Ok(rows)
}
