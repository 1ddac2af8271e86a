//! Configuration file discovery and loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`<config dir>/ai-secretary/<file>`)
//! 4. System-wide config (`/etc/ai-secretary/<file>`, Linux only)
//!
//! A missing file is never fatal: callers get built-in defaults and a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config directories
pub const CONFIG_DIR_NAME: &str = "ai-secretary";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Build an EnvFilter directive scoping the configured level to `targets`
    ///
    /// `tower_http` follows the same level so request traces line up with
    /// application logs.
    pub fn filter_directive(&self, targets: &[&str]) -> String {
        targets
            .iter()
            .chain(std::iter::once(&"tower_http"))
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Locate the config file for a component
///
/// Paths from the CLI or the environment are returned even if they do not
/// exist (the loader reports them); discovered paths must exist.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name)) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config file, falling back to defaults when it is absent
///
/// A file that exists but cannot be read or parsed is an error.
pub fn load_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Validate an `addr:port` string without binding it
pub fn validate_socket_addr(value: &str) -> Result<std::net::SocketAddr> {
    value
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", value, e)))
}
