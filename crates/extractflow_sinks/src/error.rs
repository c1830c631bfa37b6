use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by extract building and reading.
///
/// `AlreadyExists`, `MissingExtract` and `SchemaMismatch` are create-mode
/// precondition failures and never touch the file. `Io` and `Format` are
/// storage failures; the previously committed file survives those too.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extract already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("No extract to append to at {}", path.display())]
    MissingExtract { path: PathBuf },

    #[error("Schema mismatch for extract {}: {detail}", path.display())]
    SchemaMismatch { path: PathBuf, detail: String },

    #[error("Row {row} column '{column}' cannot be encoded: {reason}")]
    RowEncode {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Not a readable extract {}: {message}", path.display())]
    Format { path: PathBuf, message: String },
}

impl ExtractError {
    pub(crate) fn io(path: &Path, operation: &'static str, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }

    /// Storage failure raised by the arrow/parquet layer while writing.
    pub(crate) fn storage(
        path: &Path,
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::io(path, operation, io::Error::other(source))
    }

    pub(crate) fn format(path: &Path, message: impl Into<String>) -> Self {
        ExtractError::Format {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// A create-mode precondition was violated; nothing was written.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ExtractError::AlreadyExists { .. }
                | ExtractError::MissingExtract { .. }
                | ExtractError::SchemaMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
