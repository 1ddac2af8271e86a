//! # AI Secretary Common Library
//!
//! Shared code for the AI Secretary playback service and its clients:
//! - Track identifiers and playback status types
//! - Event types (SecretaryEvent enum) and the EventBus
//! - Configuration file discovery and TOML loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackPhase, PlaybackStatus, SecretaryEvent, TrackId};
