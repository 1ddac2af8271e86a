//! Configuration for secretary-player
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (via clap `env`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Steps 1 and 2 arrive together as [`CliOverrides`]; [`Config::resolve`]
//! layers them over the TOML file and validates the result.

use crate::error::{Error, Result};
use crate::playback::SwitchPolicy;
use secretary_common::config::{validate_socket_addr, LoggingConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Config file name under the `ai-secretary` config directories
pub const CONFIG_FILE_NAME: &str = "player.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SECRETARY_CONFIG";

const MIN_PROGRESS_INTERVAL_MS: u64 = 10;

/// Contents of `player.toml`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Local control API address
    ///
    /// Default: 127.0.0.1:5780
    #[serde(default)]
    pub bind_addr: Option<String>,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub player: PlayerSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Calls service connection
#[derive(Clone, Deserialize, Default)]
pub struct ServiceSection {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token attached to audio requests
    #[serde(default)]
    pub token: Option<String>,

    /// Transport timeout; unset means no deadline
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl std::fmt::Debug for ServiceSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSection")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Playback behaviour
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlayerSection {
    #[serde(default)]
    pub switch_policy: Option<SwitchPolicy>,

    /// Output device name (None = system default)
    #[serde(default)]
    pub output_device: Option<String>,

    #[serde(default)]
    pub progress_interval_ms: Option<u64>,

    /// EventBus capacity before slow subscribers lag
    #[serde(default)]
    pub event_capacity: Option<usize>,
}

/// Values taken from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_addr: Option<String>,
    pub service_url: Option<String>,
    pub token: Option<String>,
    pub switch_policy: Option<SwitchPolicy>,
    pub output_device: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved configuration
#[derive(Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub service_url: String,
    pub token: Option<String>,
    pub request_timeout: Option<Duration>,
    pub switch_policy: SwitchPolicy,
    pub output_device: Option<String>,
    pub progress_interval: Duration,
    pub event_capacity: usize,
    pub logging: LoggingConfig,
}

impl Config {
    pub const DEFAULT_BIND_ADDR: &'static str = "127.0.0.1:5780";
    pub const DEFAULT_SERVICE_URL: &'static str = "http://localhost:3000/api";
    pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 250;
    pub const DEFAULT_EVENT_CAPACITY: usize = 100;

    /// Layer `cli` over `toml` over built-in defaults and validate
    pub fn resolve(toml: TomlConfig, cli: CliOverrides) -> Result<Self> {
        let bind_addr = cli
            .bind_addr
            .or(toml.bind_addr)
            .unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = validate_socket_addr(&bind_addr)?;

        let service_url = cli
            .service_url
            .or(toml.service.base_url)
            .unwrap_or_else(|| Self::DEFAULT_SERVICE_URL.to_string());
        if service_url.trim().is_empty() {
            return Err(Error::Config("service URL must not be empty".to_string()));
        }

        let token = cli.token.or(toml.service.token).filter(|t| !t.is_empty());

        let request_timeout = match toml.service.request_timeout_ms {
            Some(0) => {
                return Err(Error::Config(
                    "service.request_timeout_ms must be greater than 0".to_string(),
                ))
            }
            other => other.map(Duration::from_millis),
        };

        let progress_interval_ms = toml
            .player
            .progress_interval_ms
            .unwrap_or(Self::DEFAULT_PROGRESS_INTERVAL_MS);
        if progress_interval_ms < MIN_PROGRESS_INTERVAL_MS {
            return Err(Error::Config(format!(
                "player.progress_interval_ms must be at least {}",
                MIN_PROGRESS_INTERVAL_MS
            )));
        }

        let event_capacity = toml
            .player
            .event_capacity
            .unwrap_or(Self::DEFAULT_EVENT_CAPACITY);
        if event_capacity == 0 {
            return Err(Error::Config(
                "player.event_capacity must be greater than 0".to_string(),
            ));
        }

        let mut logging = toml.logging;
        if let Some(level) = cli.log_level {
            logging.level = level;
        }

        Ok(Self {
            bind_addr,
            service_url,
            token,
            request_timeout,
            switch_policy: cli
                .switch_policy
                .or(toml.player.switch_policy)
                .unwrap_or_default(),
            output_device: cli.output_device.or(toml.player.output_device),
            progress_interval: Duration::from_millis(progress_interval_ms),
            event_capacity,
            logging,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("service_url", &self.service_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("switch_policy", &self.switch_policy)
            .field("output_device", &self.output_device)
            .field("progress_interval", &self.progress_interval)
            .field("event_capacity", &self.event_capacity)
            .field("logging", &self.logging)
            .finish()
    }
}
