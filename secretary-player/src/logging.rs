//! Tracing setup
//!
//! The subscriber is installed before any config work so that config file
//! warnings are visible. It starts on `RUST_LOG` (or `info`) and switches to
//! the configured level once the configuration is resolved, unless
//! `RUST_LOG` is set.

use crate::error::{Error, Result};
use secretary_common::config::LoggingConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Targets the configured level applies to
const LOG_TARGETS: &[&str] = &["secretary_player", "secretary_common"];

/// Handle for swapping the active filter
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// True when `RUST_LOG` overrides the configured level
pub fn env_filter_set() -> bool {
    std::env::var_os(EnvFilter::DEFAULT_ENV).is_some()
}

/// Filter used until the configuration is resolved
pub fn bootstrap_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber with a reloadable filter
pub fn init() -> FilterHandle {
    let (filter, handle) = reload::Layer::new(bootstrap_filter());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

/// Switch to the configured level
pub fn apply_config(handle: &FilterHandle, logging: &LoggingConfig) -> Result<()> {
    let invalid = |e: &dyn std::fmt::Display| {
        Error::Config(format!("invalid log level '{}': {}", logging.level, e))
    };
    logging
        .level
        .parse::<LevelFilter>()
        .map_err(|e| invalid(&e))?;
    let filter = EnvFilter::try_new(logging.filter_directive(LOG_TARGETS)).map_err(|e| invalid(&e))?;
    handle
        .reload(filter)
        .map_err(|e| Error::Config(format!("failed to apply log level: {}", e)))
}
