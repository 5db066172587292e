//! voicepipe - real-time bidirectional audio for streaming speech
//! sessions.
//!
//! Bridges a live microphone to a remote streaming speech service and
//! plays synthesized speech back with gapless, low-latency scheduling:
//!
//! - [`audio::CaptureEngine`] owns the microphone and emits fixed-size
//!   base64 PCM frames over a channel.
//! - [`audio::PlaybackEngine`] schedules irregularly-arriving base64
//!   PCM chunks back-to-back with no gap or overlap, and cuts them all
//!   immediately on barge-in.
//! - [`session::SessionLink`] is the websocket orchestrator wiring the
//!   two engines to the wire protocol in [`protocol`].

pub mod audio;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;

pub use audio::{CaptureEngine, PlaybackEngine};
pub use config::{AudioConfig, Config};
pub use error::AudioError;
