//! Speaker playback engine with gapless scheduling.
//!
//! Encoded chunks arrive at an unpredictable cadence from the network;
//! the engine schedules them back-to-back on a monotonic timeline so
//! they play as one continuous stream, and supports immediate hard
//! stop for barge-in. Decoding and device writes happen on a dedicated
//! OS thread; `play` and `stop` only touch shared state and return
//! immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::timeline::{MonotonicClock, Timeline};
use super::{SourceSet, convert};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// How many consecutive failed recoveries before dropping the rest of
/// a chunk to break a dead loop.
const MAX_RECOVERY_RETRIES: u32 = 3;

struct QueuedChunk {
    /// Stop generation at enqueue time; a chunk from an older
    /// generation was cancelled before it reached the device.
    generation: u64,
    data: String,
}

enum PlayerMsg {
    Chunk(QueuedChunk),
    /// A hard stop happened; flush whatever the device has buffered.
    /// Sent through the same channel so a stop wakes the thread even
    /// when it is parked waiting for the next chunk.
    Flush,
}

/// What the playback thread does with a received message.
#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    Play,
    Discard,
    FlushDevice,
}

fn dispatch(msg: &PlayerMsg, current_generation: u64) -> Dispatch {
    match msg {
        PlayerMsg::Flush => Dispatch::FlushDevice,
        PlayerMsg::Chunk(c) if c.generation != current_generation => Dispatch::Discard,
        PlayerMsg::Chunk(_) => Dispatch::Play,
    }
}

struct PlaybackShared {
    generation: AtomicU64,
    timeline: Mutex<Timeline>,
    sources: Mutex<SourceSet>,
    clock: MonotonicClock,
}

impl PlaybackShared {
    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Plays an asynchronous sequence of encoded PCM chunks with no gap
/// and no overlap, in arrival order.
///
/// One engine instance owns one output device for the lifetime of a
/// conversational session. There is no pause; the only transitions are
/// idle → playing (on `play`) and playing → idle (on `stop` or when
/// the source set drains naturally).
pub struct PlaybackEngine {
    shared: Arc<PlaybackShared>,
    chunk_tx: mpsc::UnboundedSender<PlayerMsg>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Open the output device and start the playback thread.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let (pcm, params) = device_open(config)?;

        if params.sample_rate != config.playback_sample_rate {
            tracing::warn!(
                requested = config.playback_sample_rate,
                actual = params.sample_rate,
                "hardware substituted a different playback rate"
            );
        }

        let shared = Arc::new(PlaybackShared {
            generation: AtomicU64::new(0),
            timeline: Mutex::new(Timeline::new()),
            sources: Mutex::new(SourceSet::new()),
            clock: MonotonicClock::new(),
        });

        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let source_rate = config.playback_sample_rate;

        let handle = thread::Builder::new().name("audio-play".into()).spawn({
            let shared = shared.clone();
            move || {
                if let Err(e) = playback_thread(&pcm, params, source_rate, chunk_rx, &shared) {
                    tracing::error!(error = %e, "playback thread error");
                }
            }
        })?;

        tracing::info!(
            device = %config.playback_device,
            rate = params.sample_rate,
            "playback engine ready"
        );

        Ok(Self {
            shared,
            chunk_tx,
            handle: Some(handle),
        })
    }

    /// Queue one base64 PCM chunk for gapless playback. Never blocks;
    /// chunks play strictly in the order they were queued.
    pub fn play(&self, chunk: impl Into<String>) {
        let queued = QueuedChunk {
            generation: self.shared.current_generation(),
            data: chunk.into(),
        };
        if self.chunk_tx.send(PlayerMsg::Chunk(queued)).is_err() {
            tracing::warn!("playback thread gone, dropping chunk");
        }
    }

    /// Hard stop (barge-in): cancel everything queued or playing and
    /// reset the timeline so the next session schedules from the
    /// current clock time. Idempotent.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        lock(&self.shared.sources).clear();
        lock(&self.shared.timeline).reset();
        // The generation bump cancels queued chunks and aborts an
        // in-flight write; the flush command additionally wakes an
        // idle thread so the device's buffered tail is cut even when
        // nothing is being written right now.
        let _ = self.chunk_tx.send(PlayerMsg::Flush);
        tracing::debug!("playback interrupted, schedule reset");
    }

    /// Number of chunks scheduled or playing right now.
    pub fn active_sources(&self) -> usize {
        lock(&self.shared.sources).len()
    }

    /// Seconds (on the engine clock) at which the next queued chunk
    /// would begin if it arrived while the pipeline is still ahead.
    pub fn next_start(&self) -> f64 {
        lock(&self.shared.timeline).next_start()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
        // The thread exits once the chunk sender is dropped with the
        // engine; detach rather than block on a join here.
        self.handle.take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn device_open(
    config: &AudioConfig,
) -> Result<(alsa::pcm::PCM, super::device::PcmParams), AudioError> {
    super::device::open_playback(
        &config.playback_device,
        config.playback_sample_rate,
        Some(config.capture_block_size),
    )
}

fn playback_thread(
    pcm: &alsa::pcm::PCM,
    params: super::device::PcmParams,
    source_rate: u32,
    mut chunk_rx: mpsc::UnboundedReceiver<PlayerMsg>,
    shared: &PlaybackShared,
) -> Result<()> {
    let io = pcm.io_i16().context("failed to map playback I/O")?;

    while let Some(msg) = chunk_rx.blocking_recv() {
        let chunk = match dispatch(&msg, shared.current_generation()) {
            Dispatch::FlushDevice => {
                flush_device(pcm);
                continue;
            }
            // Cancelled by a stop between enqueue and here.
            Dispatch::Discard => continue,
            Dispatch::Play => match msg {
                PlayerMsg::Chunk(chunk) => chunk,
                PlayerMsg::Flush => continue,
            },
        };

        let samples = match convert::decode_frame(&chunk.data) {
            Ok(s) => s,
            Err(e) => {
                // A single corrupt chunk must not silence the session.
                tracing::warn!(error = %e, "dropping malformed audio chunk");
                continue;
            }
        };
        if samples.is_empty() {
            continue;
        }

        let buffer = convert::pcm_to_f32(&samples);
        let duration = buffer.len() as f64 / f64::from(source_rate);

        let (start, id) = {
            let now = shared.clock.now();
            let start = lock(&shared.timeline).schedule(now, duration);
            (start, lock(&shared.sources).register())
        };
        tracing::trace!(start, duration, "scheduled chunk");

        // Write eagerly: the device ring buffer paces a fast producer
        // through writei back-pressure, keeping a healthy margin at
        // chunk boundaries. A stalled producer underruns naturally and
        // the write loop recovers, so the audible gap lands exactly
        // where the timeline says it does.
        write_buffer(pcm, &io, &buffer, params.period_size, shared, chunk.generation);
        lock(&shared.sources).finish(id);
    }

    tracing::debug!("playback channel closed");
    Ok(())
}

/// Cut whatever the device has already buffered and rearm it for the
/// next session. Best-effort on both steps; a failing flush must not
/// prevent the rearm.
fn flush_device(pcm: &alsa::pcm::PCM) {
    if let Err(e) = pcm.drop() {
        tracing::debug!(error = %e, "device flush skipped");
    }
    if let Err(e) = pcm.prepare() {
        tracing::error!(error = %e, "failed to rearm device after flush");
    }
}

/// Write one decoded buffer to the device one period at a time,
/// checking for interruption between writes so barge-in lands within a
/// period, with XRUN recovery between short writes.
fn write_buffer(
    pcm: &alsa::pcm::PCM,
    io: &alsa::pcm::IO<'_, i16>,
    buffer: &[f32],
    period_size: usize,
    shared: &PlaybackShared,
    generation: u64,
) {
    let pcm_out = convert::f32_to_pcm(buffer);
    let mut written = 0;
    let mut retries = 0u32;

    while written < pcm_out.len() {
        if generation != shared.current_generation() {
            // Cut is audible immediately rather than after the ring
            // buffer drains.
            flush_device(pcm);
            return;
        }

        let end = (written + period_size).min(pcm_out.len());
        match io.writei(&pcm_out[written..end]) {
            Ok(n) => {
                written += n;
                retries = 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, "playback underrun, recovering");
                retries += 1;
                if pcm.prepare().is_err() || retries >= MAX_RECOVERY_RETRIES {
                    tracing::error!(
                        dropped = pcm_out.len() - written,
                        "giving up on chunk after repeated recovery failures"
                    );
                    return;
                }
            }
        }
    }
}
