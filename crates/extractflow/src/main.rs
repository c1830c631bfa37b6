//! extractflow command-line launcher
//!
//! - `refresh`: JSON input → schema → extract → catalog
//! - `build` / `publish`: the two halves on their own
//! - `inspect` / `config`: read-only helpers

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use extractflow_logging::{init_logging, LogConfig};
use extractflow_protocol::{CreateMode, PublishMode};

mod cli;

use cli::error::HelpfulError;
use cli::publish::Secrets;

#[derive(Parser, Debug)]
#[command(
    name = "extractflow",
    version,
    about = "Build typed columnar extracts and publish them to an analytic catalog"
)]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SecretArgs {
    /// Catalog password for username/password credentials
    #[arg(long, env = "EXTRACTFLOW_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Secret for access-token credentials
    #[arg(long, env = "EXTRACTFLOW_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,
}

impl std::fmt::Debug for SecretArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretArgs")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token_secret", &self.token_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<SecretArgs> for Secrets {
    fn from(args: SecretArgs) -> Self {
        Secrets {
            password: args.password,
            token_secret: args.token_secret,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the extract from a JSON batch and publish it
    Refresh {
        /// JSON array or newline-delimited JSON records
        input: PathBuf,

        /// Refresh configuration (default: ~/.extractflow/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extract path, overriding the config
        #[arg(long)]
        path: Option<PathBuf>,

        /// create_and_replace, create_or_replace, create_and_append,
        /// create_or_append or create_only
        #[arg(long)]
        create_mode: Option<CreateMode>,

        /// overwrite, append or create_new
        #[arg(long)]
        publish_mode: Option<PublishMode>,

        /// Also write the normalised input as CSV
        #[arg(long)]
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        secrets: SecretArgs,
    },

    /// Build the extract only
    Build {
        /// JSON array or newline-delimited JSON records
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extract path, overriding the config
        #[arg(long)]
        path: Option<PathBuf>,

        /// Create-mode, overriding the config
        #[arg(short, long)]
        mode: Option<CreateMode>,

        /// Also write the normalised input as CSV
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Publish an already committed extract
    Publish {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extract to publish (default: the configured extract path)
        #[arg(long)]
        extract: Option<PathBuf>,

        /// Publish-mode, overriding the config
        #[arg(short, long)]
        mode: Option<PublishMode>,

        #[command(flatten)]
        secrets: SecretArgs,
    },

    /// Show an extract's schema, row count and fingerprint
    Inspect {
        path: PathBuf,

        /// Also show the first N rows
        #[arg(short = 'n', long)]
        rows: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved paths and configuration
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Refresh {
            input,
            config,
            path,
            create_mode,
            publish_mode,
            snapshot,
            secrets,
        } => cli::refresh::run(cli::refresh::RefreshArgs {
            input,
            config,
            path,
            create_mode,
            publish_mode,
            snapshot,
            secrets: secrets.into(),
        }),
        Commands::Build {
            input,
            config,
            path,
            mode,
            snapshot,
        } => cli::build::run(cli::build::BuildArgs {
            input,
            config,
            path,
            mode,
            snapshot,
        }),
        Commands::Publish {
            config,
            extract,
            mode,
            secrets,
        } => cli::publish::run(cli::publish::PublishArgs {
            config,
            extract,
            mode,
            secrets: secrets.into(),
        }),
        Commands::Inspect { path, rows, json } => {
            cli::inspect::run(cli::inspect::InspectArgs { path, rows, json })
        }
        Commands::Config { config } => cli::config::run(cli::config::ConfigArgs { config }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "extractflow",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<HelpfulError>() {
                Some(helpful) => eprint!("{}", helpful),
                None => eprintln!("{:?}", err),
            }
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_modes_parse_from_flags() {
        let cli = Cli::try_parse_from([
            "extractflow",
            "refresh",
            "orders.json",
            "--create-mode",
            "CREATE_AND_REPLACE",
            "--publish-mode",
            "overwrite",
        ])
        .unwrap();
        match cli.command {
            Commands::Refresh {
                create_mode,
                publish_mode,
                ..
            } => {
                assert_eq!(create_mode, Some(CreateMode::AndReplace));
                assert_eq!(publish_mode, Some(PublishMode::Overwrite));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bad_mode_is_rejected() {
        let result = Cli::try_parse_from(["extractflow", "build", "in.json", "--mode", "sometimes"]);
        assert!(result.is_err());
    }
}
