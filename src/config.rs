use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Audio pipeline configuration.
///
/// The two sample rates are the only contract-bearing knobs: they must
/// stay in sync with whatever the remote service consumes and produces.
/// The engines do not resample.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// ALSA playback device name
    pub playback_device: String,
    /// Rate requested for capture; the service expects 16 kHz PCM.
    /// Hardware may negotiate a different rate (logged, not resampled).
    pub capture_sample_rate: u32,
    /// Samples per captured frame. Small and constant: a smaller block
    /// cuts round-trip latency for barge-in responsiveness at the cost
    /// of more frequent encoding work.
    pub capture_block_size: usize,
    /// Rate of the PCM the service streams down, typically 24 kHz.
    pub playback_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_device: "default".to_string(),
            playback_device: "default".to_string(),
            capture_sample_rate: 16000,
            capture_block_size: 512,
            playback_sample_rate: 24000,
        }
    }
}

/// Top-level configuration for the demo client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Websocket endpoint of the streaming speech service.
    pub server_url: String,
    /// Bearer token sent on the upgrade request.
    pub api_key: String,
    /// Model name declared in the setup message.
    pub model: String,
    pub audio: AudioConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "wss://127.0.0.1:9072/stream".to_string(),
            api_key: String::new(),
            model: "models/default-voice".to_string(),
            audio: AudioConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing. Parse errors are still fatal.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let audio = AudioConfig::default();
        assert_eq!(audio.capture_sample_rate, 16000);
        assert_eq!(audio.playback_sample_rate, 24000);
        assert_eq!(audio.capture_block_size, 512);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            server_url = "wss://example.net/session"

            [audio]
            capture_device = "plughw:1,0"
            "#,
        )
        .unwrap();
        assert_eq!(config.server_url, "wss://example.net/session");
        assert_eq!(config.audio.capture_device, "plughw:1,0");
        assert_eq!(config.audio.playback_sample_rate, 24000);
    }
}
