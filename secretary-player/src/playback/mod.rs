//! Single-flight playback of call recordings
//!
//! One [`PlaybackController`] owns the only playback session. Every view
//! reaches it through `toggle` and observes it through a
//! [`PlaybackSubscription`].

mod controller;
mod session;
mod subscription;

pub use controller::PlaybackController;
pub use session::SessionId;
pub use subscription::PlaybackSubscription;

use serde::{Deserialize, Serialize};

/// What a toggle for a different track does while a load is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SwitchPolicy {
    /// Ignore the request until the current load settles
    #[default]
    Wait,
    /// Abandon the current load and start the requested track
    Restart,
}

impl std::fmt::Display for SwitchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchPolicy::Wait => write!(f, "wait"),
            SwitchPolicy::Restart => write!(f, "restart"),
        }
    }
}
