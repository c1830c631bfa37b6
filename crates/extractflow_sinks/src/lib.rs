//! Local extract storage.
//!
//! An extract is a Parquet file holding one table. Its extract schema
//! (column names, column types, table identity) is stored as JSON in the
//! file's key-value metadata next to a fingerprint, so the file describes
//! itself.
//!
//! Writers never touch the destination directly:
//! - content goes to a hidden temp file in the same directory
//! - the temp file is synced and renamed over the destination
//! - a dropped, uncommitted stage deletes its temp file

pub mod codec;
pub mod error;
pub mod reader;
pub mod snapshot;
pub mod staging;
pub mod writer;

pub use codec::{arrow_schema, FINGERPRINT_METADATA_KEY, SCHEMA_METADATA_KEY};
pub use error::{ExtractError, Result};
pub use reader::{
    inspect_extract, probe_extract, read_extract, read_schema, ExistingExtract, Extract,
    ExtractSummary,
};
pub use snapshot::write_csv_snapshot;
pub use staging::StagedFile;
pub use writer::{plan, BuildPlan, CommitReport, ExtractState, ExtractWriter};
