//! `logdeck`: live container logs in the terminal.
//!
//! Lists the containers the log server knows about and streams the selected
//! one over a WebSocket, following the tail as lines arrive. Dropped streams
//! are retried a bounded number of times.
//!
//! Logs go to a file (default `/tmp/logdeck.log`) to keep the terminal clean.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod panes;
mod theme;
mod tui;
mod widgets;

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use logdeck_config::Config;
use logdeck_core::Controller;

use crate::app::App;

/// Stream container logs from a logdeck server.
#[derive(Parser, Debug)]
#[command(name = "logdeck", version, about)]
struct Cli {
    /// Log server URL (e.g., http://localhost:8080)
    #[arg(short = 's', long, env = "LOGDECK_SERVER")]
    server: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "/tmp/logdeck.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    init_config: bool,
}

/// File-based tracing. Writing to stdout/stderr would corrupt the UI.
/// Hold the returned guard until exit so buffered lines get flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "logdeck={log_level},logdeck_core={log_level},logdeck_api={log_level}"
        ))
    });

    let log_dir = cli.log_file.parent().unwrap_or(Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("logdeck.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Config file + env, then CLI flags on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => logdeck_config::load_config_from(path),
        None => logdeck_config::load_config(),
    }
    .wrap_err("failed to load configuration")?;

    if let Some(server) = &cli.server {
        config.server.clone_from(server);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = load_config(&cli)?;

    if cli.init_config {
        let path = match &cli.config {
            Some(path) => {
                logdeck_config::save_config_to(&config, path)?;
                path.clone()
            }
            None => logdeck_config::save_config(&config)?,
        };
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let controller_config = config
        .to_controller_config()
        .wrap_err("invalid configuration")?;
    info!(server = %controller_config.server, "starting logdeck");

    let controller = Controller::new(controller_config)?;
    let mut app = App::new(controller);
    app.run().await?;

    Ok(())
}
