//! The refresh pipeline: dataset → schema → committed extract → catalog entry.
//!
//! Each phase writes one human-readable progress line to the caller's
//! writer. Nothing here retries; a failed refresh is re-run from the
//! original dataset.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use extractflow_catalog::{
    CatalogPublisher, CatalogTransport, PublishError, PublishRequest, Published,
};
use extractflow_protocol::Dataset;
use extractflow_schema::{
    dataset_from_json_records, read_json_records, SchemaBuilder, SchemaError, SchemaReport,
};
use extractflow_sinks::{write_csv_snapshot, CommitReport, ExtractError, ExtractWriter};
use thiserror::Error;
use tracing::info;

use crate::config::{PublishSettings, RefreshConfig};

/// A refresh failure, tagged with the phase that produced it.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Cannot read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Failed to write progress: {0}")]
    Progress(#[source] io::Error),
}

impl RefreshError {
    /// Which phase failed.
    pub fn phase(&self) -> &'static str {
        match self {
            RefreshError::Input { .. } => "input",
            RefreshError::Config(_) => "config",
            RefreshError::Schema(_) => "schema",
            RefreshError::Extract(_) => "extract",
            RefreshError::Publish(_) => "publish",
            RefreshError::Progress(_) => "progress",
        }
    }
}

pub type Result<T> = std::result::Result<T, RefreshError>;

/// Schema and commit details of a finished build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub report: SchemaReport,
    pub commit: CommitReport,
    pub snapshot_rows: Option<usize>,
}

/// A finished refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub build: BuildOutcome,
    pub published: Published,
}

fn progress(out: &mut dyn Write, line: std::fmt::Arguments<'_>) -> Result<()> {
    writeln!(out, "{}", line).map_err(RefreshError::Progress)
}

/// Read a JSON array or newline-delimited JSON file into a dataset.
pub fn load_dataset(input: &Path) -> Result<Dataset> {
    let file = File::open(input).map_err(|source| RefreshError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let records = read_json_records(BufReader::new(file))?;
    let dataset = dataset_from_json_records(&records)?;
    info!(
        "Loaded {} records with {} columns from {}",
        dataset.num_rows(),
        dataset.num_columns(),
        input.display()
    );
    Ok(dataset)
}

/// Build the schema and commit the extract under the configured create-mode.
pub fn build_extract(
    config: &RefreshConfig,
    dataset: &Dataset,
    out: &mut dyn Write,
) -> Result<BuildOutcome> {
    let snapshot_rows = match &config.extract.snapshot {
        Some(path) => {
            let rows = write_csv_snapshot(dataset, path)?;
            progress(out, format_args!("Snapshot written: {} ({} rows)", path.display(), rows))?;
            Some(rows)
        }
        None => None,
    };

    let options = config.schema_options();
    let coercer = options.coercer();
    let report = SchemaBuilder::new(options).build_with_report(dataset)?;
    let columns: Vec<String> = report
        .schema
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.column_type))
        .collect();
    progress(
        out,
        format_args!(
            "Schema built: {} ({})",
            report.schema.table(),
            columns.join(", ")
        ),
    )?;

    let mut writer = ExtractWriter::open(&config.extract.path)?.with_coercer(coercer);
    let commit = writer.write(config.extract.create_mode, &report.schema, dataset)?;
    progress(
        out,
        format_args!(
            "Extract committed: {} ({} rows, {})",
            commit.path.display(),
            commit.total_rows,
            commit.mode
        ),
    )?;

    Ok(BuildOutcome {
        report,
        commit,
        snapshot_rows,
    })
}

/// Publish the committed extract at `extract` through `transport`.
pub fn publish_extract(
    settings: &PublishSettings,
    extract: &Path,
    transport: Box<dyn CatalogTransport>,
    out: &mut dyn Write,
) -> Result<Published> {
    let mut publisher =
        CatalogPublisher::new(transport, settings.server.clone(), settings.credentials.clone());
    let request = PublishRequest::new(extract, settings.target.clone(), settings.mode);
    let published = publisher.publish(&request)?;

    match published.row_count {
        Some(rows) => progress(
            out,
            format_args!(
                "Published: {} ({}, {} rows) at {}",
                published.target,
                published.mode,
                rows,
                published.local_time()
            ),
        )?,
        None => progress(
            out,
            format_args!(
                "Published: {} ({}) at {}",
                published.target,
                published.mode,
                published.local_time()
            ),
        )?,
    }
    Ok(published)
}

/// Build, commit and publish one dataset.
///
/// A build failure stops before any catalog traffic.
pub fn refresh(
    config: &RefreshConfig,
    dataset: &Dataset,
    transport: Box<dyn CatalogTransport>,
    out: &mut dyn Write,
) -> Result<RefreshOutcome> {
    let settings = config
        .publish
        .as_ref()
        .ok_or_else(|| RefreshError::Config("no [publish] section configured".to_string()))?;
    let build = build_extract(config, dataset, out)?;
    let published = publish_extract(settings, &build.commit.path, transport, out)?;
    Ok(RefreshOutcome { build, published })
}
