//! `extractflow build`: JSON input → committed extract, no publish

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use extractflow::{build_extract, load_dataset, RefreshConfig};
use extractflow_protocol::CreateMode;

use crate::cli::config;
use crate::cli::error::HelpfulError;

#[derive(Debug)]
pub struct BuildArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub mode: Option<CreateMode>,
    pub snapshot: Option<PathBuf>,
}

/// Command-line values win over the config file.
pub fn apply_overrides(
    config: &mut RefreshConfig,
    path: Option<PathBuf>,
    mode: Option<CreateMode>,
    snapshot: Option<PathBuf>,
) {
    if let Some(path) = path {
        config.extract.path = path;
    }
    if let Some(mode) = mode {
        config.extract.create_mode = mode;
    }
    if snapshot.is_some() {
        config.extract.snapshot = snapshot;
    }
}

pub fn run(args: BuildArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(HelpfulError::file_not_found(&args.input).into());
    }
    let mut config = config::resolve(args.config.as_deref(), false)?;
    apply_overrides(&mut config, args.path, args.mode, args.snapshot);

    let dataset = load_dataset(&args.input).map_err(HelpfulError::from)?;
    let mut stdout = io::stdout().lock();
    build_extract(&config, &dataset, &mut stdout).map_err(HelpfulError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = RefreshConfig::default();
        config.extract.snapshot = Some(PathBuf::from("keep.csv"));

        apply_overrides(&mut config, Some("x.extract".into()), Some(CreateMode::Only), None);
        assert_eq!(config.extract.path, PathBuf::from("x.extract"));
        assert_eq!(config.extract.create_mode, CreateMode::Only);
        assert_eq!(config.extract.snapshot, Some(PathBuf::from("keep.csv")));
    }
}
