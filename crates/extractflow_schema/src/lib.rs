//! Schema construction for extractflow
//!
//! # Pipeline
//!
//! 1. **Normalize**: semi-structured JSON records become a [`Dataset`]
//!    ([`normalize`])
//! 2. **Infer**: each column's type comes from its first non-null sample
//!    ([`inference`])
//! 3. **Build**: columns are validated and frozen into a [`Schema`]
//!    ([`builder`])
//! 4. **Coerce**: at write time every cell is fitted to its column type
//!    ([`coerce`])
//!
//! # First-sample policy
//!
//! Inference looks at one value per column and does not re-scan the rest.
//! A column whose later values disagree with the first sample keeps the
//! sampled type; disagreeing values become null when written (or fail the
//! build with [`SchemaOptions::strict`]). This is a known limitation, kept
//! on purpose so the resulting schema is predictable from the first row.
//!
//! [`Dataset`]: extractflow_protocol::Dataset
//! [`Schema`]: extractflow_protocol::Schema

pub mod builder;
pub mod coerce;
pub mod date_formats;
pub mod inference;
pub mod normalize;

use thiserror::Error;

pub use builder::{ColumnOrigin, InferredColumn, SchemaBuilder, SchemaOptions, SchemaReport};
pub use coerce::{coerce_value, ValueCoercer};
pub use inference::{infer_column_type, sample_type};
pub use normalize::{dataset_from_json_records, read_json_records};

/// Errors returned while building or applying a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Duplicate column name: '{name}'")]
    DuplicateColumn { name: String },

    #[error("Dataset has no columns")]
    EmptySchema,

    #[error("Type override for unknown column '{column}'")]
    UnknownOverrideColumn { column: String },

    #[error("Row {row} column '{column}': cannot store {value_kind} value '{value}' as {target}")]
    ValueCoercion {
        row: usize,
        column: String,
        value_kind: &'static str,
        value: String,
        target: extractflow_protocol::ColumnType,
    },

    #[error("Record {index} is not a JSON object (got {kind})")]
    InvalidRecord { index: usize, kind: &'static str },

    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset: {0}")]
    Dataset(extractflow_protocol::ProtocolError),
}

impl SchemaError {
    /// True for the validation family (duplicate / empty / bad override).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchemaError::DuplicateColumn { .. }
                | SchemaError::EmptySchema
                | SchemaError::UnknownOverrideColumn { .. }
        )
    }
}

impl From<extractflow_protocol::ProtocolError> for SchemaError {
    fn from(err: extractflow_protocol::ProtocolError) -> Self {
        use extractflow_protocol::ProtocolError;
        match err {
            ProtocolError::DuplicateColumn { name } => SchemaError::DuplicateColumn { name },
            ProtocolError::EmptySchema => SchemaError::EmptySchema,
            other => SchemaError::Dataset(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
