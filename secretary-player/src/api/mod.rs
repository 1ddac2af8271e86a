//! Local HTTP control surface
//!
//! Dashboard views toggle playback and follow the session over SSE.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
