//! Microphone capture engine.
//!
//! Owns one ALSA capture stream for the lifetime of a session and runs
//! it on a dedicated OS thread (NOT a tokio task) so async network
//! scheduling can never starve the audio callback cadence. Each
//! fixed-size block of samples is base64-encoded and pushed into a
//! bounded channel; the session orchestrator's send loop is the single
//! consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{convert, device};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Captures microphone audio and delivers fixed-size encoded frames.
///
/// At most one capture session runs per engine instance; `start` while
/// running is refused with [`AudioError::Busy`].
pub struct CaptureEngine {
    config: AudioConfig,
    session: Option<CaptureSession>,
}

struct CaptureSession {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl CaptureEngine {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Acquire the microphone and start delivering encoded frames on
    /// `frame_tx` until [`Self::stop`] is called.
    ///
    /// The device is opened on the caller's thread so acquisition
    /// failures (no device, busy, access refused) surface synchronously
    /// as [`AudioError::Acquisition`].
    pub fn start(&mut self, frame_tx: mpsc::Sender<String>) -> Result<(), AudioError> {
        if self.session.is_some() {
            return Err(AudioError::Busy);
        }

        let (pcm, params) =
            device::open_capture(&self.config.capture_device, self.config.capture_sample_rate)?;

        if params.sample_rate != self.config.capture_sample_rate {
            // We proceed with whatever rate the hardware gave us; the
            // encoded stream's implied timing will be off on the
            // receiving end. Known fidelity risk, surfaced loudly.
            tracing::warn!(
                requested = self.config.capture_sample_rate,
                actual = params.sample_rate,
                "hardware substituted a different capture rate"
            );
        }

        let running = Arc::new(AtomicBool::new(true));
        let block_size = self.config.capture_block_size;

        let handle = thread::Builder::new().name("audio-capture".into()).spawn({
            let running = running.clone();
            move || {
                if let Err(e) = capture_thread(&pcm, params, block_size, &frame_tx, &running) {
                    tracing::error!(error = %e, "capture thread error");
                }
            }
        })?;

        tracing::info!(
            device = %self.config.capture_device,
            rate = params.sample_rate,
            block = block_size,
            "capture started"
        );

        self.session = Some(CaptureSession { running, handle });
        Ok(())
    }

    /// Stop capturing and release the microphone. Idempotent, and safe
    /// to call when `start` never succeeded.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.running.store(false, Ordering::SeqCst);
        if session.handle.join().is_err() {
            tracing::error!("capture thread panicked during shutdown");
        }
        tracing::debug!("capture stopped");
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    pcm: &alsa::pcm::PCM,
    params: device::PcmParams,
    block_size: usize,
    frame_tx: &mpsc::Sender<String>,
    running: &AtomicBool,
) -> Result<()> {
    let io = pcm.io_i16().context("failed to map capture I/O")?;

    let mut read_buf = vec![0i16; params.period_size];
    // Accumulate to exact block boundaries; each emitted frame is an
    // independent block_size-sample unit.
    let mut accum: Vec<i16> = Vec::with_capacity(block_size * 2);

    while running.load(Ordering::Relaxed) {
        match io.readi(&mut read_buf) {
            Ok(frames) => {
                accum.extend_from_slice(&read_buf[..frames]);
                while accum.len() >= block_size {
                    let frame = convert::encode_frame(&accum[..block_size]);
                    if !deliver_frame(frame_tx, frame) {
                        tracing::warn!("frame receiver dropped, stopping capture");
                        return Ok(());
                    }
                    accum.drain(..block_size);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture overrun, recovering");
                pcm.prepare()
                    .context("failed to recover capture stream")?;
            }
        }
    }

    Ok(())
}

/// Hand one encoded frame to the consumer without ever blocking the
/// audio thread. A full channel means the transport has stalled; the
/// frame is dropped so capture keeps running and `stop` can still
/// join. Returns false only when the receiver is gone for good.
fn deliver_frame(frame_tx: &mpsc::Sender<String>, frame: String) -> bool {
    match frame_tx.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("frame channel full, dropping frame");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
