//! Command-line interface for alarmsim.
//!
//! This module provides the CLI structure for the `alarmsim` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FleetCommand, PreviewCommand, RunCommand};

/// alarmsim - Simulate a fleet of IoT alarm devices
///
/// Emits synthetic alarm events (device id, coordinates, image reference,
/// status) as JSON to an event ingestion endpoint, for exercising
/// event-driven backends.
#[derive(Debug, Parser)]
#[command(name = "alarmsim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start sending alarm events
    Run(RunCommand),

    /// Print the generated device fleet
    Fleet(FleetCommand),

    /// Print sample payloads without sending them
    Preview(PreviewCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "alarmsim");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(
            parse(&["alarmsim", "-q", "preview"]).verbosity(),
            crate::logging::Verbosity::Quiet
        );
        assert_eq!(
            parse(&["alarmsim", "preview"]).verbosity(),
            crate::logging::Verbosity::Normal
        );
        assert_eq!(
            parse(&["alarmsim", "-v", "preview"]).verbosity(),
            crate::logging::Verbosity::Verbose
        );
        assert_eq!(
            parse(&["alarmsim", "-vv", "preview"]).verbosity(),
            crate::logging::Verbosity::Trace
        );
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = parse(&["alarmsim", "run"]);
        match cli.command {
            Command::Run(cmd) => {
                assert!(!cmd.dry_run);
                assert!(cmd.devices.is_none());
                assert!(cmd.duration.is_none());
                assert!(cmd.max_events.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = parse(&[
            "alarmsim",
            "run",
            "--dry-run",
            "--devices",
            "25",
            "--duration",
            "60",
            "-m",
            "100",
            "--seed",
            "7",
            "--json",
        ]);
        match cli.command {
            Command::Run(cmd) => {
                assert!(cmd.dry_run);
                assert_eq!(cmd.devices, Some(25));
                assert_eq!(cmd.duration, Some(60));
                assert_eq!(cmd.max_events, Some(100));
                assert_eq!(cmd.seed, Some(7));
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_preview_count() {
        let cli = parse(&["alarmsim", "preview", "-n", "5"]);
        assert!(matches!(cli.command, Command::Preview(PreviewCommand { count: 5, .. })));
    }

    #[test]
    fn test_parse_fleet_json() {
        let cli = parse(&["alarmsim", "fleet", "--json"]);
        assert!(matches!(cli.command, Command::Fleet(FleetCommand { json: true, .. })));
    }

    #[test]
    fn test_parse_config_show() {
        let cli = parse(&["alarmsim", "config", "show", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["alarmsim", "--config", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
