//! Common error types for AI Secretary

use thiserror::Error;

/// Common result type for AI Secretary operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across AI Secretary components
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML file could not be parsed
    #[error("Invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}
