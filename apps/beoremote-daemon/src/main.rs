//! BeoRemote Daemon - headless discovery and connection coordinator.
//!
//! Browses the local network for BeoRemote devices, keeps the preferred one
//! connected, and accepts simple commands on stdin. Surface updates are
//! logged, or printed as JSON lines with `--json-events`.

mod config;
mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use beoremote_core::{
    bootstrap_services, FilePreferenceStore, LoggingSurface, MemoryPreferenceStore, NoopSurface,
    PreferenceStore, PresentationSurface, SurfaceEvent, TokioSpawner,
};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;

use crate::config::DaemonConfig;

/// BeoRemote Daemon - discover and connect BeoRemote devices.
#[derive(Parser, Debug)]
#[command(name = "beoremote-daemon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BEOREMOTE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Device to connect automatically (replaces any stored default).
    #[arg(short = 'D', long, env = "BEOREMOTE_DEFAULT_DEVICE")]
    default_device: Option<String>,

    /// Data directory for persistent preferences.
    #[arg(short = 'd', long, env = "BEOREMOTE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds per resolve attempt, 0 for no limit (overrides config file).
    #[arg(long)]
    resolve_timeout: Option<u64>,

    /// Print surface events to stdout as JSON lines.
    #[arg(long)]
    json_events: bool,

    /// Do not log surface updates.
    #[arg(short, long)]
    quiet: bool,

    /// Do not read commands from stdin.
    #[arg(long)]
    no_console: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("BeoRemote Daemon v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(run(args));

    // A pending stdin read holds a blocking thread that never returns by itself
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(args: Args) -> Result<()> {
    let mut config =
        DaemonConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }
    if let Some(secs) = args.resolve_timeout {
        config.resolve_timeout_secs = secs;
    }

    let preferences = open_preferences(&config, args.default_device.as_deref())?;
    let core_config = config.to_core_config();
    log::info!(
        "Configuration: service_type={}, resolve_timeout={}s, watchdog={}s",
        core_config.service_type,
        core_config.resolve_timeout_secs,
        core_config.watchdog_interval_secs
    );

    let services = bootstrap_services(&core_config, preferences, TokioSpawner::current())
        .context("Failed to bootstrap services")?;

    if args.json_events {
        tokio::spawn(print_surface_events(services.surface_bridge.subscribe()));
    }
    let external: Arc<dyn PresentationSurface> = if args.quiet || args.json_events {
        Arc::new(NoopSurface)
    } else {
        Arc::new(LoggingSurface)
    };
    services.surface_bridge.set_external_surface(external);

    services
        .start_background_tasks()
        .context("Failed to start discovery")?;

    let (shutdown_tx, _) = broadcast::channel(1);
    if !args.no_console {
        tokio::spawn(console::run(services.handle.clone(), shutdown_tx.subscribe()));
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());
    services.shutdown().await;

    Ok(())
}

/// Opens the preference store and applies the requested default device.
///
/// A name given on the command line replaces the stored default. The config
/// file's name only seeds a store that has none yet.
fn open_preferences(
    config: &DaemonConfig,
    cli_default: Option<&str>,
) -> Result<Arc<dyn PreferenceStore>> {
    let preferences: Arc<dyn PreferenceStore> = match &config.data_dir {
        Some(dir) => {
            log::info!("Using data directory: {}", dir.display());
            Arc::new(FilePreferenceStore::open(dir))
        }
        None => {
            log::info!("No data directory configured - preferences will not persist");
            Arc::new(MemoryPreferenceStore::new(None))
        }
    };

    let stored = preferences.default_device_name();
    match (cli_default, config.default_device.as_deref()) {
        (Some(name), _) => {
            if stored.as_deref().is_some_and(|stored| stored != name) {
                log::info!("Replacing stored default device {:?} with {:?}", stored, name);
            }
            preferences
                .set_default_device_name(name)
                .context("Failed to store default device")?;
        }
        (None, Some(name)) if stored.is_none() => {
            preferences
                .set_default_device_name(name)
                .context("Failed to store default device")?;
        }
        (None, Some(name)) => {
            log::info!("Keeping stored default device over configured {:?}", name);
        }
        (None, None) => {}
    }
    if let Some(name) = preferences.default_device_name() {
        log::info!("Default device: {}", name);
    }
    Ok(preferences)
}

async fn print_surface_events(mut events: broadcast::Receiver<SurfaceEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => log::warn!("Failed to encode surface event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Surface event printer lagged, skipped {} event(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
