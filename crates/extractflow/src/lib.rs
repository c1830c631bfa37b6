//! extractflow: typed columnar extracts, built locally and published to a
//! catalog.
//!
//! A refresh runs strictly downward:
//!
//! ```text
//! JSON records → Dataset → SchemaBuilder → ExtractWriter → CatalogPublisher
//! ```
//!
//! Configuration is read once into a [`RefreshConfig`] and passed into each
//! phase; there is no process-wide session or credential state.

pub mod config;
pub mod pipeline;

pub use config::{ExtractSettings, PublishSettings, RefreshConfig};
pub use pipeline::{
    build_extract, load_dataset, publish_extract, refresh, BuildOutcome, RefreshError,
    RefreshOutcome,
};
