//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hostwatch - host metrics agent with a Prometheus scrape endpoint
#[derive(Parser, Debug)]
#[command(
    name = "hostwatch",
    author,
    version,
    about = "Host metrics agent",
    long_about = "Polls collectors on their own schedules, routes their metrics through \n\
                  per-collector dispatchers, and serves a generation-consistent \n\
                  Prometheus exposition."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HOSTWATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HOSTWATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "HOSTWATCH_CONFIG")]
    pub config: PathBuf,

    /// Override the HTTP listen address from configuration
    #[arg(long, env = "HOSTWATCH_LISTEN")]
    pub listen: Option<String>,

    /// Stop after every collector ran this many cycles (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub max_cycles: u64,

    /// Agent timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0")]
    pub timeout: u64,

    /// Validate configuration and exit without running the agent
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml", env = "HOSTWATCH_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "HOSTWATCH_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "hostwatch",
            "-v",
            "run",
            "-c",
            "agent.toml",
            "--listen",
            "0.0.0.0:9100",
            "--max-cycles",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("agent.toml"));
        assert_eq!(args.listen.as_deref(), Some("0.0.0.0:9100"));
        assert_eq!(args.max_cycles, 3);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["hostwatch", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_format_conversion() {
        let cli =
            Cli::try_parse_from(["hostwatch", "--log-format", "json", "info", "--json"]).unwrap();
        assert_eq!(
            observability::LogFormat::from(cli.log_format),
            observability::LogFormat::Json
        );
    }
}
