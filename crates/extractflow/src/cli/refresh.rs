//! `extractflow refresh`: the whole pipeline in one run

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use extractflow::{load_dataset, refresh, RefreshError};
use extractflow_catalog::open_transport;
use extractflow_protocol::{CreateMode, PublishMode};

use crate::cli::build::apply_overrides;
use crate::cli::config;
use crate::cli::error::HelpfulError;
use crate::cli::publish::{self, Secrets};

#[derive(Debug)]
pub struct RefreshArgs {
    pub input: PathBuf,
    pub config: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub create_mode: Option<CreateMode>,
    pub publish_mode: Option<PublishMode>,
    pub snapshot: Option<PathBuf>,
    pub secrets: Secrets,
}

pub fn run(args: RefreshArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(HelpfulError::file_not_found(&args.input).into());
    }
    let mut config = config::resolve(args.config.as_deref(), true)?
        .with_secrets(args.secrets.password, args.secrets.token_secret);
    apply_overrides(&mut config, args.path, args.create_mode, args.snapshot);
    let settings = publish::settings(&config, args.publish_mode)?;
    config.publish = Some(settings.clone());

    // Open the transport before building so a bad address fails fast.
    let transport = open_transport(&settings.server)
        .map_err(|err| HelpfulError::from(RefreshError::Publish(err)))?;
    let dataset = load_dataset(&args.input).map_err(HelpfulError::from)?;

    let mut stdout = io::stdout().lock();
    refresh(&config, &dataset, transport, &mut stdout).map_err(HelpfulError::from)?;
    Ok(())
}
