use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, warn};

mod alert;
mod config;
mod engine;
mod models;
mod probe;
mod utils;

use crate::alert::SmtpAlerter;
use crate::config::{CheckConfig, DEFAULT_CONFIG_FILE};
use crate::engine::Monitor;
use crate::probe::NrpeRunner;

#[derive(Parser)]
#[command(name = "nrpe-watch", about = "Run an NRPE check on a loop and email on failure")]
struct Cli {
    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Silence output except for errors.
    #[arg(long)]
    quiet: bool,

    /// Configuration file path.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.debug, cli.quiet);

    let config = CheckConfig::load(&cli.config_file)
        .with_context(|| format!("Failed to load {}", cli.config_file.display()))?;
    debug!(
        config = %serde_json::to_string_pretty(&config).unwrap_or_default(),
        "loaded configuration"
    );

    let alerter = SmtpAlerter::new(
        config.monitor.email_from.clone(),
        &config.monitor.smtp_host,
        config.monitor.smtp_port,
    );
    let mut monitor = Monitor::new(config, NrpeRunner, alerter);
    monitor.run(shutdown_signal()).await;

    debug!(state = ?monitor.state(), "monitor stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
