mod config;
mod logging;
mod runner;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adaptive_bitrate::{ladder_index, PolicyEngine};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ffmpeg_encoder::{encoder_version, FleetController};
use link_telemetry::{ConnectionChecker, RciSignalSource};
use tracing::{error, info, warn};

use crate::config::AdapterConfig;
use crate::runner::{run_loop, LoopExit};

/// Link Adapter - Wi-Fi aware encoder control
///
/// - Polls the router for the Wi-Fi station's RSSI and noise floor
/// - Maps the signal-to-noise ratio onto a ladder of encoder profiles
/// - Restarts ffmpeg on every configured device when the profile changes

#[derive(Parser, Debug)]
#[command(name = "link-adapter")]
#[command(about = "Adapt ffmpeg resolution, bitrate and frame rate to Wi-Fi link quality")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "link-adapter.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the signal and drive the encoders (default)
    Run,

    /// Print the generated profile ladder
    Ladder,

    /// Run the reachability checks once
    Check,

    /// Read the signal once and show which profile it selects
    Probe,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = AdapterConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let _guard = logging::init_logging(config.settings.log_file.as_deref())
                .context("Failed to initialise logging")?;
            run_adapter(&config)
        }
        Commands::Ladder => print_ladder(&config),
        Commands::Check => {
            let _guard = logging::init_logging(None).context("Failed to initialise logging")?;
            print_checks(&config)
        }
        Commands::Probe => {
            let _guard = logging::init_logging(None).context("Failed to initialise logging")?;
            probe(&config)
        }
    }
}

fn run_adapter(config: &AdapterConfig) -> Result<()> {
    info!(devices = config.devices.len(), "Configuration loaded");
    for device in &config.devices {
        info!(device = %device.name, output = %device.output, "Configured device");
    }

    match encoder_version(&config.encoder.program) {
        Some(version) => info!(%version, "Encoder found"),
        None => warn!(program = %config.encoder.program, "Encoder not found or not runnable"),
    }

    let ladder = config.ladder()?;

    if let Some(check) = &config.connection_check {
        let checker = ConnectionChecker::new(&check.ping_ip, check.http_url.as_deref())?;
        let report = checker.check_all();
        if report.all_ok() {
            info!("Initial connection checks passed");
        } else {
            error!(ping = report.ping, http = report.http, "Initial connection checks failed");
        }
    }

    let mut source = RciSignalSource::new(&config.router.address, &config.router.interface)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let fleet = FleetController::system(&config.devices, &config.encoder);
    let mut policy = PolicyEngine::new(ladder, fleet);

    let exit = run_loop(
        &mut source,
        &mut policy,
        config.settings.interval(),
        &shutdown,
    );

    policy.sink_mut().stop_all();

    match exit {
        LoopExit::Shutdown => {
            info!("Shutdown complete");
            Ok(())
        }
        LoopExit::MissingReading => bail!("No signal information available from router"),
        LoopExit::Telemetry(e) => Err(e).context("Failed to read signal information"),
    }
}

fn print_ladder(config: &AdapterConfig) -> Result<()> {
    let ladder = config.ladder()?;

    println!("{:>5}  {:>11}  {:>8}  {:>4}  {:>8}", "INDEX", "RESOLUTION", "BITRATE", "FPS", "MIN SNR");
    for (index, profile) in ladder.iter().enumerate() {
        let min_snr = if index == ladder.steps() {
            "-".to_string()
        } else {
            format!("{} dB", (ladder.steps() - index) * 10)
        };
        println!(
            "{:>5}  {:>11}  {:>8}  {:>4}  {:>8}",
            index,
            profile.resolution(),
            profile.bitrate(),
            profile.fps,
            min_snr
        );
    }
    Ok(())
}

fn print_checks(config: &AdapterConfig) -> Result<()> {
    let Some(check) = &config.connection_check else {
        bail!("No [connection_check] section in config");
    };
    let checker = ConnectionChecker::new(&check.ping_ip, check.http_url.as_deref())?;
    let report = checker.check_all();

    println!("Ping {}: {}", checker.ping_ip(), status(report.ping));
    println!(
        "HTTP {}: {}",
        check.http_url.as_deref().unwrap_or("(not configured)"),
        status(report.http)
    );

    if !report.all_ok() {
        bail!("Connection checks failed");
    }
    Ok(())
}

fn probe(config: &AdapterConfig) -> Result<()> {
    let ladder = config.ladder()?;
    let mut source = RciSignalSource::new(&config.router.address, &config.router.interface)?;

    let Some(wifi) = source.wifi_status()? else {
        bail!("No signal information available from router");
    };
    let reading = wifi.reading();
    let index = ladder_index(reading.snr(), ladder.steps());

    println!("SSID:    {}", wifi.ssid.as_deref().unwrap_or("-"));
    println!("RSSI:    {} dBm", reading.rssi_or_default());
    println!("Noise:   {} dBm", reading.noise_or_default());
    println!("SNR:     {} dB", reading.snr());
    if let Some(quality) = wifi.quality() {
        println!("Quality: {}%", quality);
    }
    println!("Profile: #{} {}", index, ladder[index]);
    Ok(())
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAILED"
    }
}
