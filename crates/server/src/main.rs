// SPDX-License-Identifier: MIT

//! dispatchd: the job coordination daemon
//!
//! Serves the internal orchestrator API and runs the stale-lease reaper.

use std::path::PathBuf;

use dispatch_server::{app, AppState, Config};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: dispatchd <config.toml>");
            std::process::exit(2);
        }
    };

    let config = Config::load(&config_path)?;

    // Set up logging before anything that can fail loudly
    let _log_guard = setup_logging(&config)?;

    info!(config = %config_path.display(), "starting dispatchd");

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("failed to open job store: {}", e);
            return Err(e.into());
        }
    };

    // Reaper runs for the life of the process
    tokio::spawn(dispatch_server::reaper::run(
        state.clone(),
        config.lease_staleness,
        config.reaper_interval,
    ));

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("listening on {}", config.listen);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dispatchd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }
}

fn setup_logging(
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_path {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file_name = log_path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "dispatchd.log".into());
            let dir = log_path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}
