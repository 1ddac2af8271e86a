//! # AI Secretary Call Audio Player (secretary-player)
//!
//! Single-flight playback of call recordings for the AI Secretary dashboard.
//!
//! **Purpose:** Fetch a call's audio from the calls service, decode it and
//! play it on the local output device, while any number of dashboard views
//! toggle playback and observe one shared session over HTTP/SSE.
//!
//! **Architecture:** [`playback::PlaybackController`] owns the session;
//! [`fetch::AudioFetcher`] and [`audio::PlaybackBackend`] are its two seams
//! (reqwest, and symphonia + rubato + cpal in production).

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{PlaybackController, PlaybackSubscription, SwitchPolicy};
