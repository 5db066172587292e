//! Websocket session link to the streaming speech service.
//!
//! Bridges the audio engines to the network: captured frames arrive on
//! an mpsc channel and go out as realtime input messages; inbound
//! server content is routed straight into the playback engine, with
//! `interrupted` mapped to an immediate playback stop (barge-in).

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::audio::PlaybackEngine;
use crate::config::Config;
use crate::protocol::{ClientMessage, ServerMessage};

/// Session-level events for whoever hosts the conversation.
#[derive(Debug)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    /// The agent finished a full response turn.
    TurnComplete,
    /// Transcript text the service attached to its audio.
    Transcript(String),
}

pub struct SessionLink {
    config: Config,
    frame_rx: mpsc::Receiver<String>,
    playback: Arc<PlaybackEngine>,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionLink {
    pub fn new(
        config: Config,
        frame_rx: mpsc::Receiver<String>,
        playback: Arc<PlaybackEngine>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            frame_rx,
            playback,
            events,
        }
    }

    /// Run the session until the frame channel closes (shutdown).
    /// Lost connections reconnect with exponential backoff.
    pub async fn run(mut self) {
        let mut retry_delay = 1;
        loop {
            match self.connect_and_stream().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, retry_in = retry_delay, "session dropped");
                    let _ = self.events.send(SessionEvent::Disconnected).await;
                    // A half-played response from the dead session must
                    // not linger into the next one.
                    self.playback.stop();
                    tokio::time::sleep(tokio::time::Duration::from_secs(retry_delay)).await;
                    retry_delay = std::cmp::min(retry_delay * 2, 60);
                }
            }
        }
    }

    async fn connect_and_stream(&mut self) -> anyhow::Result<()> {
        let url = Url::parse(&self.config.server_url)?;
        let host = url.host_str().unwrap_or_default();

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(self.config.server_url.as_str())
            .header("Host", host)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .body(())?;

        tracing::info!(url = %self.config.server_url, "connecting");
        let (ws_stream, _) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        self.events.send(SessionEvent::Connected).await?;

        let setup = serde_json::to_string(&ClientMessage::setup(self.config.model.clone()))?;
        write.send(Message::Text(setup.into())).await?;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_server_text(&text).await,
                        Some(Ok(Message::Close(frame))) => {
                            anyhow::bail!("server closed connection: {frame:?}");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => anyhow::bail!("connection closed"),
                    }
                }
                frame = self.frame_rx.recv() => {
                    match frame {
                        Some(data) => {
                            let msg = ClientMessage::audio_frame(
                                self.config.audio.capture_sample_rate,
                                data,
                            );
                            write.send(Message::Text(serde_json::to_string(&msg)?.into())).await?;
                        }
                        // Capture side is gone: clean shutdown.
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    async fn handle_server_text(&self, text: &str) {
        let Ok(msg) = serde_json::from_str::<ServerMessage>(text) else {
            tracing::debug!("ignoring non-JSON server message");
            return;
        };

        if msg.interrupted() {
            tracing::debug!("barge-in signalled, cutting playback");
            self.playback.stop();
        }

        for chunk in msg.audio_chunks() {
            self.playback.play(chunk);
        }

        if let Some(content) = &msg.server_content {
            if let Some(turn) = &content.model_turn {
                for part in &turn.parts {
                    if let Some(text) = &part.text {
                        let _ = self
                            .events
                            .send(SessionEvent::Transcript(text.clone()))
                            .await;
                    }
                }
            }
        }

        if msg.turn_complete() {
            let _ = self.events.send(SessionEvent::TurnComplete).await;
        }
    }
}
