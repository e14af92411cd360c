//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Print payloads to stdout instead of posting them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of simulated devices (overrides fleet.device_count)
    #[arg(short, long, value_name = "N")]
    pub devices: Option<usize>,

    /// Stop after this many seconds (overrides schedule.max_duration_secs)
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Stop after this many events (overrides schedule.max_events)
    #[arg(short, long, value_name = "N")]
    pub max_events: Option<u64>,

    /// Seed the random generator for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the run summary as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl RunCommand {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(devices) = self.devices {
            config.fleet.device_count = devices;
        }
        if let Some(duration) = self.duration {
            config.schedule.max_duration_secs = duration;
        }
        if let Some(max_events) = self.max_events {
            config.schedule.max_events = max_events;
        }
        if let Some(seed) = self.seed {
            config.schedule.seed = Some(seed);
        }
    }
}

/// Fleet command arguments.
#[derive(Debug, Args)]
pub struct FleetCommand {
    /// Number of simulated devices (overrides fleet.device_count)
    #[arg(short, long, value_name = "N")]
    pub devices: Option<usize>,

    /// Seed the random generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Preview command arguments.
#[derive(Debug, Args)]
pub struct PreviewCommand {
    /// Number of payloads to print
    #[arg(short = 'n', long, default_value = "3")]
    pub count: usize,

    /// Seed the random generator
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (secrets masked)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
