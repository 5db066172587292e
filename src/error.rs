//! Error types for the audio engines.

use thiserror::Error;

/// Errors surfaced by the capture and playback engines.
///
/// Nothing here is fatal to the hosting process; every failure mode
/// degrades to "this session's audio stops working". Recoverable device
/// hiccups (XRUN etc.) are handled inside the audio threads and never
/// reach the caller.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The hardware device could not be acquired (missing, busy, or the
    /// platform refused access). Not retried automatically; the session
    /// orchestrator decides what to tell the user.
    #[error("failed to acquire audio device '{device}': {source}")]
    Acquisition {
        device: String,
        #[source]
        source: alsa::Error,
    },

    /// A capture session is already running on this engine instance.
    #[error("capture session already running")]
    Busy,

    /// An encoded audio chunk could not be decoded (malformed base64 or
    /// a byte length that is not a multiple of the sample width).
    #[error("malformed audio chunk: {0}")]
    Decode(String),

    /// Spawning a dedicated audio thread failed.
    #[error("failed to spawn audio thread")]
    Thread(#[from] std::io::Error),
}
