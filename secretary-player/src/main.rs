//! AI Secretary call audio player - Main entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use secretary_common::config::{load_toml, resolve_config_path};
use secretary_common::EventBus;
use secretary_player::audio::CpalBackend;
use secretary_player::config::{CliOverrides, Config, TomlConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use secretary_player::fetch::HttpAudioFetcher;
use secretary_player::logging;
use secretary_player::{PlaybackController, SwitchPolicy};
use tokio::signal;
use tracing::info;

/// Command-line arguments for secretary-player
#[derive(Parser, Debug)]
#[command(name = "secretary-player")]
#[command(about = "Call audio player for the AI Secretary dashboard")]
#[command(version)]
struct Args {
    /// Path to player.toml
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Address for the local control API
    #[arg(short, long, env = "SECRETARY_BIND_ADDR")]
    bind: Option<String>,

    /// Calls service base URL
    #[arg(long, env = "SECRETARY_SERVICE_URL")]
    service_url: Option<String>,

    /// Bearer token for the calls service
    #[arg(long, env = "SECRETARY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Toggle for another track while loading: wait or restart
    #[arg(long, value_enum, env = "SECRETARY_SWITCH_POLICY")]
    switch_policy: Option<SwitchPolicy>,

    /// Audio output device name
    #[arg(long, env = "SECRETARY_OUTPUT_DEVICE")]
    device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SECRETARY_LOG_LEVEL")]
    log_level: Option<String>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for device in CpalBackend::list_devices().context("Failed to list audio devices")? {
            println!("{}", device);
        }
        return Ok(());
    }

    // Installed before config work so config file warnings are visible
    let log_filter = logging::init();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let toml_config: TomlConfig =
        load_toml(config_path.as_deref()).context("Failed to load configuration file")?;

    let config = Config::resolve(
        toml_config,
        CliOverrides {
            bind_addr: args.bind,
            service_url: args.service_url,
            token: args.token,
            switch_policy: args.switch_policy,
            output_device: args.device,
            log_level: args.log_level,
        },
    )
    .context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    if !logging::env_filter_set() {
        logging::apply_config(&log_filter, &config.logging).context("Invalid logging configuration")?;
    }

    info!("Starting AI Secretary call audio player");
    info!("Configuration: {:?}", config);

    let fetcher = HttpAudioFetcher::new(&config.service_url, config.token.clone(), config.request_timeout)
        .context("Failed to create calls service client")?;
    let backend = CpalBackend::new(config.output_device.clone(), config.progress_interval)
        .context("Failed to open audio output")?;

    let controller = PlaybackController::new(
        Arc::new(fetcher),
        Arc::new(backend),
        EventBus::new(config.event_capacity),
        config.switch_policy,
    );

    secretary_player::api::run(config.bind_addr, controller.clone(), shutdown_signal())
        .await
        .context("HTTP server failed")?;

    controller.shutdown();
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
