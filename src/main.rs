//! imgwatch - image watch-and-resize service
//!
//! Entry point for the watcher and dashboard server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use imgwatch::server::{init_metrics, init_tracing, App, DashboardState, ServerConfig};
use imgwatch::transform::OverlayResize;
use imgwatch::watcher::WatchSupervisor;
use imgwatch::{Config, Result};

/// imgwatch - keep resized, date-stamped copies of watched images
#[derive(Parser, Debug)]
#[command(name = "imgwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "IMGWATCH_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Host address to bind the dashboard to
    #[arg(long, env = "IMGWATCH_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "IMGWATCH_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "IMGWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging output
    #[arg(long, env = "IMGWATCH_LOG_JSON")]
    log_json: bool,

    /// Log file, also served at /log
    #[arg(long, env = "IMGWATCH_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Skip processing of files already present at startup
    #[arg(long, env = "IMGWATCH_NO_BACKFILL")]
    no_backfill: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.dashboard.host = host;
        }
        if let Some(port) = self.port {
            config.dashboard.port = port;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if self.log_json {
            config.log.json = true;
        }
        if let Some(file) = self.log_file {
            config.log.file = Some(file);
        }
        if self.no_backfill {
            config.proc.process_on_start = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    let _log_guard = init_tracing(
        &config.log.level,
        config.log.json,
        config.log.file.as_deref(),
    )?;

    tracing::info!("imgwatch v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    init_metrics();

    let supervisor = Arc::new(WatchSupervisor::start(
        config.directory_pairs(),
        Arc::new(OverlayResize::new()),
    )?);

    if config.proc.process_on_start {
        let backfill = Arc::clone(&supervisor);
        tokio::task::spawn_blocking(move || {
            let processed = backfill.process_existing_files();
            tracing::info!(processed, "Startup backfill complete");
        });
    }

    let server_config = ServerConfig {
        host: config.dashboard.host.clone(),
        port: config.dashboard.port,
        ..Default::default()
    };

    let state = DashboardState {
        supervisor: Arc::clone(&supervisor),
        listing_limit: config.listing_limit(),
        log_file: config.log.file.clone(),
    };

    let result = App::new(server_config, state).run().await;

    supervisor.stop();
    tracing::info!("Watchers stopped");
    result
}
