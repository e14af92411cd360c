//! `alarmsim` - CLI for the IoT alarm simulator
//!
//! This binary loads configuration, builds the simulated fleet and either
//! runs the dispatch loop or prints what it would send.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use alarmsim::cli::{Cli, Command, ConfigCommand, FleetCommand, PreviewCommand, RunCommand};
use alarmsim::{
    init_logging, seeded_rng, Config, EventSink, Fleet, HttpSink, ImageCatalog, JsonLinesSink,
    RunSummary, Simulator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbosity());

    match cli.command {
        Command::Run(run_cmd) => handle_run(load_config(cli.config)?, &run_cmd).await,
        Command::Fleet(fleet_cmd) => handle_fleet(load_config(cli.config)?, &fleet_cmd),
        Command::Preview(preview_cmd) => handle_preview(load_config(cli.config)?, &preview_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("could not load configuration")
}

async fn handle_run(mut config: Config, cmd: &RunCommand) -> anyhow::Result<()> {
    cmd.apply(&mut config);
    config.validate()?;

    let sink: Box<dyn EventSink> = if cmd.dry_run {
        Box::new(JsonLinesSink::stdout())
    } else {
        let sink = HttpSink::from_config(&config)?;
        info!(endpoint = %sink.url(), "posting events");
        Box::new(sink)
    };

    let mut simulator = Simulator::new(&config, sink)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C; rely on run limits to stop");
            // Keep the sender alive so the simulator doesn't read a closed
            // channel as a shutdown request.
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let summary = simulator.run(shutdown_rx).await;
    signal_task.abort();

    // Dry-run payloads own stdout.
    let report = render_summary(&summary, cmd.json)?;
    if cmd.dry_run {
        eprintln!("{report}");
    } else {
        println!("{report}");
    }

    if summary.all_failed() {
        bail!(
            "none of the {} alarm events were accepted by the endpoint",
            summary.failed
        );
    }
    Ok(())
}

fn render_summary(summary: &RunSummary, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(summary)?);
    }

    let mut out = String::new();
    writeln!(out)?;
    writeln!(out, "Run Summary")?;
    writeln!(out, "===========")?;
    writeln!(out, "  Sent:         {}", summary.sent)?;
    writeln!(out, "  Failed:       {}", summary.failed)?;
    writeln!(
        out,
        "  Elapsed:      {:.1}s",
        Duration::from_millis(summary.elapsed_ms).as_secs_f64()
    )?;
    write!(out, "  Stopped by:   {}", summary.stop_reason)?;
    Ok(out)
}

fn handle_fleet(mut config: Config, cmd: &FleetCommand) -> anyhow::Result<()> {
    if let Some(devices) = cmd.devices {
        config.fleet.device_count = devices;
    }
    if cmd.seed.is_some() {
        config.schedule.seed = cmd.seed;
    }
    config.validate()?;

    let mut rng = seeded_rng(config.schedule.seed);
    let catalog = ImageCatalog::new(&config.images.root_url, &config.images.names)?;
    let fleet = Fleet::generate(&config.fleet, &catalog, &mut rng)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(fleet.devices())?);
        return Ok(());
    }

    let bounds = fleet.bounds();
    println!("Fleet ({} devices)", fleet.len());
    println!(
        "Bounds: lat {}..{}, lon {}..{}",
        bounds.lat_min, bounds.lat_max, bounds.lon_min, bounds.lon_max
    );
    println!();
    println!("{:<24} {:>12} {:>13}  STATUS", "DEVICE", "LATITUDE", "LONGITUDE");
    for device in fleet.devices() {
        println!(
            "{:<24} {:>12.6} {:>13.6}  {}",
            device.id, device.coordinates.latitude, device.coordinates.longitude, device.status
        );
    }
    Ok(())
}

fn handle_preview(mut config: Config, cmd: &PreviewCommand) -> anyhow::Result<()> {
    if cmd.seed.is_some() {
        config.schedule.seed = cmd.seed;
    }

    let mut simulator = Simulator::new(&config, Box::new(JsonLinesSink::stdout()))?;
    for _ in 0..cmd.count {
        let batch = simulator.next_event().batch();
        println!("{}", serde_json::to_string_pretty(&batch)?);
    }
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(path)?.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let unset = || "(not set)".to_string();
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Endpoint]");
                println!(
                    "  URL:                {}",
                    config.endpoint.url.clone().unwrap_or_else(unset)
                );
                println!(
                    "  Key:                {}",
                    config.endpoint.key.clone().unwrap_or_else(unset)
                );
                println!("  Auth header:        {}", config.endpoint.auth_header);
                println!("  Timeout (ms):       {}", config.endpoint.timeout_ms);
                println!();
                println!("[Images]");
                println!("  Root URL:           {}", config.images.root_url);
                println!("  Names:              {}", config.images.names.join(", "));
                println!();
                println!("[Fleet]");
                println!("  Devices:            {}", config.fleet.device_count);
                println!("  Id prefix:          {}", config.fleet.id_prefix);
                println!("  Statuses:           {}", config.fleet.statuses.len());
                println!(
                    "  Latitude:           {} .. {}",
                    config.fleet.bounds.lat_min, config.fleet.bounds.lat_max
                );
                println!(
                    "  Longitude:          {} .. {}",
                    config.fleet.bounds.lon_min, config.fleet.bounds.lon_max
                );
                println!();
                println!("[Schedule]");
                println!(
                    "  Interval (ms):      {} .. {}",
                    config.schedule.min_interval_ms, config.schedule.max_interval_ms
                );
                println!(
                    "  Max duration (s):   {}",
                    config
                        .max_duration()
                        .map_or_else(|| "unlimited".to_string(), |d| d.as_secs().to_string())
                );
                println!(
                    "  Max events:         {}",
                    config
                        .max_events()
                        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", path.unwrap_or_else(Config::default_config_path).display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if !path.exists() {
                println!("  (file not found; defaults and environment only)");
            }
            match Config::load_from(Some(path)) {
                Ok(config) => {
                    println!("Configuration is valid.");
                    if let Err(e) = config.require_endpoint() {
                        println!("Note: events cannot be sent yet: {e}");
                    }
                }
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
