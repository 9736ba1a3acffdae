//! # Gyro Pad Bridge
//!
//! Runs the discovery, pairing, telemetry, liveness and driver services
//! until Ctrl+C.
//!
//! # Examples
//!
//! Run with defaults (ports 5006/5007/5005, driver on 127.0.0.1:9876):
//! ```bash
//! cargo run --release
//! ```
//!
//! Run with a config file and route slot 2 to the driver:
//! ```bash
//! cargo run --release -- --config config/default.toml --active-slot 2 -v
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use gyro_pad_bridge::config::Config;
use gyro_pad_bridge::instance::InstanceLock;
use gyro_pad_bridge::server::Server;

/// Default log level; each `-v` raises it one step
const DEFAULT_LOG_LEVEL: Level = Level::INFO;

/// Phone motion to virtual gamepad bridge
#[derive(Parser, Debug)]
#[command(name = "gyro-pad-bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML). Built-in defaults are used when omitted
    #[arg(short, long, env = "GYRO_PAD_CONFIG")]
    config: Option<PathBuf>,

    /// Slot routed to the driver (0-3), overrides the config file
    #[arg(short, long)]
    active_slot: Option<usize>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => DEFAULT_LOG_LEVEL,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Set up stdout logging plus an optional log file.
///
/// The returned guard flushes the file writer on drop and must live until
/// exit.
fn init_logging(verbose: u8, file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(log_level(verbose).into());

    let (file_layer, guard) = match file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(slot) = cli.active_slot {
        config.driver.active_slot = slot;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_file = config.logging.file.as_deref().map(Path::new);
    let _log_guard = init_logging(cli.verbose, log_file)?;

    info!("Gyro Pad Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Ports: discovery {}, pairing {}, telemetry {}; driver at {}",
        config.network.discovery_port,
        config.network.pair_port,
        config.network.data_port,
        config.driver.addr
    );

    // Released on return, after every service has stopped
    let _instance = InstanceLock::acquire(&config.instance.lock_file)
        .context("Refusing to start a second server")?;

    let server = Server::new(config).context("Invalid startup configuration")?;
    info!("Active slot: {}", server.active_slot().get());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        signal.cancel();
    });

    server.run(shutdown).await?;

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(log_level(0), Level::INFO);
        assert_eq!(log_level(1), Level::DEBUG);
        assert_eq!(log_level(5), Level::TRACE);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["gyro-pad-bridge"]);
        assert!(cli.active_slot.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_active_slot_overrides_config() {
        let cli = Cli::parse_from(["gyro-pad-bridge", "--active-slot", "2", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let config = load_config(&Cli { config: None, ..cli }).unwrap();
        assert_eq!(config.driver.active_slot, 2);
        assert_eq!(config.network.pair_port, 5007);
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
