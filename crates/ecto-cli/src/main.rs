//! `ecto`: drives the scheduler over a simulated world.

mod check_config;
mod run;
mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecto_core::EctoConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "ecto.yml";

#[derive(Parser, Debug)]
#[command(name = "ecto", version, about = "Cooperative task scheduler with bank reconciliation")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the activity until it terminates
    Run(run::RunArgs),

    /// Validate the configuration and print what it resolves to
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "ecto=debug" } else { "ecto=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => {
            let code = run::execute(&config, &args)?;
            std::process::exit(code);
        }
        Command::CheckConfig => check_config::execute(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EctoConfig> {
    match path {
        Some(path) => EctoConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => EctoConfig::from_file(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load {DEFAULT_CONFIG_FILE}")),
        None => Ok(EctoConfig::default()),
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
    fn test_parses_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ecto",
            "run",
            "--scenario",
            "missing-anchor",
            "--max-ticks",
            "40",
            "-v",
            "--config",
            "custom.yml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.scenario, scenario::Scenario::MissingAnchor);
                assert_eq!(args.max_ticks, 40);
                assert!(!args.realtime);
            }
            Command::CheckConfig => panic!("expected run"),
        }
    }

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "activity: [not, a, map]").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.yml"));
    }
}
