//! Errors raised while constructing canonical types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Duplicate column name: '{name}'")]
    DuplicateColumn { name: String },

    #[error("Schema has no columns")]
    EmptySchema,

    #[error("Row {row} has {got} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Row {row} column order {got:?} does not match dataset columns {expected:?}")]
    ColumnOrderMismatch {
        row: usize,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Column '{name}' has {got} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid column type: '{0}'. Expected: integer, float, text, date")]
    InvalidColumnType(String),

    #[error("Invalid create mode: '{0}'. Expected: create_and_replace, create_or_replace, create_and_append, create_or_append, create_only")]
    InvalidCreateMode(String),

    #[error("Invalid publish mode: '{0}'. Expected: overwrite, append, create_new")]
    InvalidPublishMode(String),

    #[error("Invalid table name: '{0}'. Expected <namespace>.<name> or <name>")]
    InvalidTableName(String),
}
