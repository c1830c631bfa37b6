//! Configuration resolution and the `config` command

use std::path::{Path, PathBuf};

use anyhow::Result;
use extractflow::RefreshConfig;
use extractflow_protocol::paths::{default_config_path, default_logs_dir, extractflow_home};

use crate::cli::error::HelpfulError;

/// Config from `--config`, else the default file, else built-in defaults.
///
/// `required` turns the last fallback into an error, for commands that
/// cannot run on defaults alone.
pub fn resolve(explicit: Option<&Path>, required: bool) -> Result<RefreshConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(HelpfulError::file_not_found(path).into());
        }
        return RefreshConfig::load(path);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        RefreshConfig::load(&default_path)
    } else if required {
        Err(HelpfulError::no_config(&default_path).into())
    } else {
        Ok(RefreshConfig::default())
    }
}

#[derive(Debug)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let exists = config_path.exists();

    println!("Home:    {}", extractflow_home().display());
    println!(
        "Config:  {}{}",
        config_path.display(),
        if exists { "" } else { " (not found)" }
    );
    println!("Logs:    {}", default_logs_dir().display());

    if !exists {
        return Ok(());
    }

    let config = RefreshConfig::load(&config_path)?;
    println!();
    println!("Extract: {}", config.extract.path.display());
    println!("  create_mode: {}", config.extract.create_mode);
    println!("  table:       {}", config.schema_options().table);
    if let Some(snapshot) = &config.extract.snapshot {
        println!("  snapshot:    {}", snapshot.display());
    }
    if !config.schema.overrides.is_empty() {
        println!("  overrides:");
        for (column, column_type) in &config.schema.overrides {
            println!("    {} = {}", column, column_type);
        }
    }
    match &config.publish {
        Some(publish) => {
            println!("Publish: {} ({})", publish.target, publish.mode);
            println!("  server: {}", publish.server.base_url());
            let site = match publish.server.site.as_str() {
                "" => "(default)",
                site => site,
            };
            println!("  site:   {}", site);
            println!("  as:     {}", publish.credentials.principal());
        }
        None => println!("Publish: (not configured)"),
    }
    Ok(())
}
