use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voicepipe::audio::{CaptureEngine, PlaybackEngine};
use voicepipe::config::Config;
use voicepipe::session::{SessionEvent, SessionLink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load_or_default(Path::new("voicepipe.toml"))?;

    // Playback owns the output device for the whole conversation.
    let playback = Arc::new(PlaybackEngine::new(&config.audio)?);

    // Capture thread produces frames; the session's send loop is the
    // single consumer.
    let (frame_tx, frame_rx) = mpsc::channel::<String>(100);
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(16);

    let mut capture = CaptureEngine::new(config.audio.clone());
    capture.start(frame_tx)?;

    let link = SessionLink::new(config, frame_rx, playback.clone(), event_tx);
    let session = tokio::spawn(link.run());

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            event = event_rx.recv() => {
                match event {
                    Some(SessionEvent::Connected) => tracing::info!("session connected"),
                    Some(SessionEvent::Disconnected) => tracing::warn!("session disconnected"),
                    Some(SessionEvent::TurnComplete) => tracing::debug!("agent turn complete"),
                    Some(SessionEvent::Transcript(text)) => tracing::info!(%text, "agent"),
                    None => break,
                }
            }
        }
    }

    capture.stop();
    playback.stop();
    session.abort();

    Ok(())
}
