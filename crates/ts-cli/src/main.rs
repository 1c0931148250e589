use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ts_cli::commands::compute::{self, ComputeArgs};
use ts_cli::commands::util::parse_datetime;
use ts_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    config
        .hours
        .validate()
        .context("invalid hours configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so that --json output stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Compute {
            input,
            days,
            now,
            account,
            json,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let now = now
                .as_deref()
                .map(|s| parse_datetime(s, chrono::Utc::now()))
                .transpose()?;
            let args = ComputeArgs {
                input: input.clone(),
                days: *days,
                now,
                account: account.clone(),
                json: *json,
            };
            compute::run(&config, &args)?;
        }
        Some(Commands::Config) => {
            let config = load_config(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
