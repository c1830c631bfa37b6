//! `extractflow publish`: ship an already committed extract

use std::fmt;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use extractflow::{publish_extract, PublishSettings, RefreshError};
use extractflow_catalog::open_transport;
use extractflow_protocol::PublishMode;

use crate::cli::config;
use crate::cli::error::HelpfulError;

/// Secrets supplied outside the config file.
#[derive(Default)]
pub struct Secrets {
    pub password: Option<String>,
    pub token_secret: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub struct PublishArgs {
    pub config: Option<PathBuf>,
    pub extract: Option<PathBuf>,
    pub mode: Option<PublishMode>,
    pub secrets: Secrets,
}

/// Resolved publish settings with the mode override applied.
pub fn settings(
    config: &extractflow::RefreshConfig,
    mode: Option<PublishMode>,
) -> Result<PublishSettings> {
    let mut settings = config.publish_settings()?.clone();
    if let Some(mode) = mode {
        settings.mode = mode;
    }
    Ok(settings)
}

pub fn run(args: PublishArgs) -> Result<()> {
    let config = config::resolve(args.config.as_deref(), true)?
        .with_secrets(args.secrets.password, args.secrets.token_secret);
    let settings = settings(&config, args.mode)?;
    let extract = args.extract.unwrap_or_else(|| config.extract.path.clone());
    if !extract.exists() {
        return Err(HelpfulError::file_not_found(&extract)
            .with_suggestion("TRY: Build it first: extractflow build INPUT")
            .into());
    }

    let transport = open_transport(&settings.server)
        .map_err(|err| HelpfulError::from(RefreshError::Publish(err)))?;
    let mut stdout = io::stdout().lock();
    publish_extract(&settings, &extract, transport, &mut stdout).map_err(HelpfulError::from)?;
    Ok(())
}
