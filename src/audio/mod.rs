//! audio - Capture, playback, and PCM wire framing.
//!
//! Uses ALSA for audio I/O on dedicated OS threads. Capture emits
//! fixed-size base64 PCM frames; playback schedules base64 PCM chunks
//! gapless on a monotonic timeline, with hard stop for barge-in.

pub mod convert;
mod device;

mod capture;
mod playback;
mod sources;
mod timeline;

pub use capture::CaptureEngine;
pub use playback::PlaybackEngine;
pub use sources::SourceSet;
pub use timeline::{MonotonicClock, Timeline};
