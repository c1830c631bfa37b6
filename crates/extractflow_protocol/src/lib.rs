//! Canonical extractflow types
//!
//! Every crate in the workspace speaks these types:
//!
//! - [`Dataset`] / [`Row`] / [`Value`]: the loosely-typed input batch
//! - [`ColumnType`] / [`Schema`]: the strongly-typed description of an extract
//! - [`CreateMode`] / [`PublishMode`]: the two conflict-resolution policies
//! - [`CatalogTarget`]: identity of a catalog entry

pub mod defaults;
pub mod error;
pub mod fingerprint;
pub mod paths;
pub mod types;

pub use error::{ProtocolError, Result};
pub use fingerprint::schema_fingerprint;
pub use types::{
    CatalogTarget, ColumnDef, ColumnType, CreateMode, Dataset, PublishMode, Row, Schema,
    TableName, Value,
};
