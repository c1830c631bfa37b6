//! Temp-file staging with atomic promotion
//!
//! Content is written to `.{filename}.{uuid}.tmp` next to the destination,
//! synced, then renamed over it. Until [`StagedFile::commit`] succeeds the
//! destination is untouched; an uncommitted stage removes its temp file on
//! drop.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use extractflow_protocol::Schema;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info, warn};

use crate::codec::{arrow_schema, schema_metadata};
use crate::error::{ExtractError, Result};

/// A temp file that becomes `final_path` on commit.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Reserve a temp path beside `final_path`, creating the parent
    /// directory if needed.
    pub fn new(final_path: &Path) -> Result<Self> {
        let dir = match final_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| ExtractError::io(&dir, "create directory", err))?;

        let filename = final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ExtractError::format(final_path, "path has no file name"))?;
        let temp_path = dir.join(format!(
            ".{}.{}.tmp",
            filename,
            uuid::Uuid::new_v4().simple()
        ));

        Ok(Self {
            temp_path,
            final_path: final_path.to_path_buf(),
            committed: false,
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Create the temp file for writing.
    pub fn create(&self) -> Result<File> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.temp_path)
            .map_err(|err| ExtractError::io(&self.temp_path, "create temp file", err))
    }

    /// Flush the temp file to disk and rename it over the destination.
    pub fn commit(mut self) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .open(&self.temp_path)
            .and_then(|file| file.sync_all())
            .map_err(|err| ExtractError::io(&self.temp_path, "sync temp file", err))?;

        fs::rename(&self.temp_path, &self.final_path)
            .map_err(|err| ExtractError::io(&self.final_path, "replace", err))?;
        self.committed = true;
        sync_parent_dir(&self.final_path)?;

        debug!(
            "Promoted {} -> {}",
            self.temp_path.display(),
            self.final_path.display()
        );
        Ok(())
    }
}

/// Persist the rename itself by syncing the directory entry.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)
        .and_then(|dir_handle| dir_handle.sync_all())
        .map_err(|err| ExtractError::io(dir, "sync directory", err))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed && self.temp_path.exists() {
            let _ = fs::remove_file(&self.temp_path);
            warn!("Cleaned up orphaned temp file: {}", self.temp_path.display());
        }
    }
}

/// An extract being written to a staged temp file.
///
/// `writer` must drop (closing the file) before `staged` removes it.
pub(crate) struct ExtractStage {
    writer: Option<ArrowWriter<File>>,
    staged: StagedFile,
    arrow: SchemaRef,
    rows_written: usize,
}

impl ExtractStage {
    pub(crate) fn open(final_path: &Path, schema: &Schema) -> Result<Self> {
        let staged = StagedFile::new(final_path)?;
        let file = staged.create()?;

        info!(
            "Staging extract: {} (temp: {})",
            final_path.display(),
            staged.temp_path().display()
        );

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_key_value_metadata(Some(schema_metadata(schema, final_path)?))
            .build();

        let arrow = arrow_schema(schema);
        let writer = ArrowWriter::try_new(file, Arc::clone(&arrow), Some(props))
            .map_err(|err| ExtractError::storage(staged.temp_path(), "create writer for", err))?;

        Ok(Self {
            writer: Some(writer),
            staged,
            arrow,
            rows_written: 0,
        })
    }

    pub(crate) fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow
    }

    pub(crate) fn write_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let temp_path = self.staged.temp_path();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ExtractError::format(temp_path, "extract stage already closed"))?;
        writer
            .write(batch)
            .map_err(|err| ExtractError::storage(temp_path, "write batch to", err))?;
        self.rows_written += batch.num_rows();
        debug!(
            "Wrote {} rows to stage (total: {})",
            batch.num_rows(),
            self.rows_written
        );
        Ok(())
    }

    /// Close the writer and atomically promote the file. Returns the
    /// number of rows in the committed extract.
    pub(crate) fn commit(mut self) -> Result<usize> {
        if let Some(writer) = self.writer.take() {
            writer
                .close()
                .map_err(|err| ExtractError::storage(self.staged.temp_path(), "close", err))?;
        }
        let rows = self.rows_written;
        self.staged.commit()?;
        Ok(rows)
    }
}
