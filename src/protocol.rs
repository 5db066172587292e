//! Wire message types for the streaming speech session.
//!
//! Outbound: a one-shot `setup` message, then `realtimeInput` envelopes
//! carrying base64 PCM media chunks tagged with their mime type.
//! Inbound: server content with inline base64 audio parts, plus the
//! `interrupted` and `turnComplete` signals.

use serde::{Deserialize, Serialize};

/// One encoded audio chunk with its mime type, e.g.
/// `audio/pcm;rate=16000`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
pub struct Setup {
    pub model: String,
}

/// Messages sent to the service. Externally tagged, so these serialize
/// as `{"setup":{...}}` and `{"realtimeInput":{...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

impl ClientMessage {
    pub fn setup(model: impl Into<String>) -> Self {
        Self::Setup(Setup {
            model: model.into(),
        })
    }

    /// Wrap one captured frame as a realtime PCM chunk.
    pub fn audio_frame(sample_rate: u32, data: impl Into<String>) -> Self {
        Self::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: format!("audio/pcm;rate={sample_rate}"),
                data: data.into(),
            }],
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub interrupted: bool,
    pub turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl ServerMessage {
    /// The user spoke over the agent; queued speech must be cut now.
    pub fn interrupted(&self) -> bool {
        self.server_content.as_ref().is_some_and(|c| c.interrupted)
    }

    pub fn turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|c| c.turn_complete)
    }

    /// Base64 PCM chunks carried by this message, in order.
    pub fn audio_chunks(&self) -> impl Iterator<Item = &str> {
        self.server_content
            .iter()
            .filter_map(|c| c.model_turn.as_ref())
            .flat_map(|t| t.parts.iter())
            .filter_map(|p| p.inline_data.as_ref())
            .filter(|d| d.mime_type.starts_with("audio/pcm"))
            .map(|d| d.data.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_frame_serializes_with_mime_envelope() {
        let msg = ClientMessage::audio_frame(16000, "AAAA");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"realtimeInput":{"mediaChunks":[{"mimeType":"audio/pcm;rate=16000","data":"AAAA"}]}}"#
        );
    }

    #[test]
    fn setup_serializes_externally_tagged() {
        let json = serde_json::to_string(&ClientMessage::setup("models/demo")).unwrap();
        assert_eq!(json, r#"{"setup":{"model":"models/demo"}}"#);
    }

    #[test]
    fn server_audio_parts_parse_in_order() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{
                "serverContent": {
                    "modelTurn": {
                        "parts": [
                            {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "first"}},
                            {"text": "spoken transcript"},
                            {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "second"}}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let chunks: Vec<&str> = msg.audio_chunks().collect();
        assert_eq!(chunks, vec!["first", "second"]);
        assert!(!msg.interrupted());
    }

    #[test]
    fn interruption_flag_parses() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"interrupted": true}}"#).unwrap();
        assert!(msg.interrupted());
        assert_eq!(msg.audio_chunks().count(), 0);
    }

    #[test]
    fn unknown_messages_parse_as_empty() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(!msg.interrupted());
        assert!(!msg.turn_complete());
    }
}
