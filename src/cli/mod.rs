pub mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::logging;

#[derive(Parser)]
#[command(name = "rideplus-api")]
#[command(about = "RidePlus API - domain-scoped backend service")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Path to the YAML configuration file (default: $APP_CONFIG or config/config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Validate the route table and serve HTTP")]
    Serve,

    #[command(about = "Expand and validate the route table, then print it")]
    Routes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = logging::during_startup(|| AppConfig::load(cli.config.as_deref()))
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::Routes => commands::routes::handle(config, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rideplus-api", "routes", "--json", "--config", "x.yaml"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Routes));
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
    }
}
