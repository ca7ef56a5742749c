//! Wire envelopes for the duplex task protocol.
//!
//! Every message on the connection is either an opaque binary audio frame
//! or a JSON control envelope of the shape
//! `{ "header": { … }, "payload": { … } }`. Outbound headers carry an
//! `action`; inbound headers carry an `event`. The task identifier is
//! echoed in both directions for correlation.

use serde::{Deserialize, Serialize};

use voxline_core::{SynthesisError, VoiceOptions};

/// The streaming mode tag present in every outbound header.
const STREAMING_DUPLEX: &str = "duplex";

const TASK_GROUP_AUDIO: &str = "audio";
const TASK_TTS: &str = "tts";
const FUNCTION_SPEECH_SYNTHESIZER: &str = "SpeechSynthesizer";
const TEXT_TYPE_PLAIN: &str = "PlainText";

// ── Outbound envelopes ─────────────────────────────────────────────

/// Outbound command actions.
pub mod action {
    pub const RUN_TASK: &str = "run-task";
    pub const CONTINUE_TASK: &str = "continue-task";
    pub const FINISH_TASK: &str = "finish-task";
}

/// A complete outbound command envelope.
#[derive(Debug, Serialize)]
pub struct OutboundEnvelope {
    header: OutboundHeader,
    payload: OutboundPayload,
}

#[derive(Debug, Serialize)]
struct OutboundHeader {
    action: &'static str,
    task_id: String,
    streaming: &'static str,
}

#[derive(Debug, Default, Serialize)]
struct OutboundPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    task_group: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<SynthesisParameters>,
    input: TaskInput,
}

#[derive(Debug, Serialize)]
struct SynthesisParameters {
    text_type: &'static str,
    voice: String,
    format: &'static str,
    sample_rate: u32,
    volume: u8,
    rate: f32,
    pitch: f32,
}

#[derive(Debug, Default, Serialize)]
struct TaskInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl OutboundEnvelope {
    /// The `run-task` command: opens a synthesis task with the full
    /// parameter set and an empty input.
    #[must_use]
    pub fn run_task(task_id: &str, options: &VoiceOptions) -> Self {
        Self {
            header: OutboundHeader::new(action::RUN_TASK, task_id),
            payload: OutboundPayload {
                task_group: Some(TASK_GROUP_AUDIO),
                task: Some(TASK_TTS),
                function: Some(FUNCTION_SPEECH_SYNTHESIZER),
                model: Some(options.model.clone()),
                parameters: Some(SynthesisParameters {
                    text_type: TEXT_TYPE_PLAIN,
                    voice: options.voice.clone(),
                    format: options.format.as_str(),
                    sample_rate: options.sample_rate,
                    volume: options.volume,
                    rate: options.rate,
                    pitch: options.pitch,
                }),
                input: TaskInput::default(),
            },
        }
    }

    /// The `continue-task` command carrying the text payload.
    #[must_use]
    pub fn continue_task(task_id: &str, text: &str) -> Self {
        Self {
            header: OutboundHeader::new(action::CONTINUE_TASK, task_id),
            payload: OutboundPayload {
                input: TaskInput {
                    text: Some(text.to_string()),
                },
                ..OutboundPayload::default()
            },
        }
    }

    /// The `finish-task` command: no more input will follow.
    #[must_use]
    pub fn finish_task(task_id: &str) -> Self {
        Self {
            header: OutboundHeader::new(action::FINISH_TASK, task_id),
            payload: OutboundPayload::default(),
        }
    }

    /// Serialize the envelope to its wire form.
    pub fn to_json(&self) -> Result<String, SynthesisError> {
        serde_json::to_string(self)
            .map_err(|e| SynthesisError::Protocol(format!("failed to encode command envelope: {e}")))
    }

    /// The action tag of this envelope.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        self.header.action
    }
}

impl OutboundHeader {
    fn new(action: &'static str, task_id: &str) -> Self {
        Self {
            action,
            task_id: task_id.to_string(),
            streaming: STREAMING_DUPLEX,
        }
    }
}

// ── Inbound envelopes ──────────────────────────────────────────────

/// Inbound event kinds the session reacts to. Anything else is ignored
/// for forward compatibility.
pub mod event {
    pub const TASK_STARTED: &str = "task-started";
    pub const TASK_FINISHED: &str = "task-finished";
    pub const TASK_FAILED: &str = "task-failed";
}

/// A parsed inbound control envelope.
///
/// Only the header is interpreted; event payloads (for example the
/// `result-generated` metrics events) are not modeled.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    pub header: InboundHeader,
}

#[derive(Debug, Deserialize)]
pub struct InboundHeader {
    /// The event kind, e.g. `task-started`.
    pub event: String,

    /// Task identifier echo.
    #[serde(default)]
    pub task_id: Option<String>,

    /// Machine-readable error code on `task-failed`.
    #[serde(default)]
    pub error_code: Option<String>,

    /// Human-readable error message on `task-failed`.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl InboundEnvelope {
    /// Parse a text frame into an envelope.
    ///
    /// A parse failure is a protocol error: malformed control messages
    /// are never silently dropped.
    pub fn parse(text: &str) -> Result<Self, SynthesisError> {
        serde_json::from_str(text)
            .map_err(|e| SynthesisError::Protocol(format!("malformed control envelope: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> VoiceOptions {
        VoiceOptions::default()
    }

    #[test]
    fn run_task_envelope_carries_full_parameter_set() {
        let json = OutboundEnvelope::run_task("t-1", &options()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["header"]["action"], "run-task");
        assert_eq!(value["header"]["task_id"], "t-1");
        assert_eq!(value["header"]["streaming"], "duplex");
        assert_eq!(value["payload"]["task_group"], "audio");
        assert_eq!(value["payload"]["task"], "tts");
        assert_eq!(value["payload"]["function"], "SpeechSynthesizer");
        assert_eq!(value["payload"]["model"], "cosyvoice-v1");
        assert_eq!(value["payload"]["parameters"]["text_type"], "PlainText");
        assert_eq!(value["payload"]["parameters"]["voice"], "longxiaochun");
        assert_eq!(value["payload"]["parameters"]["format"], "mp3");
        assert_eq!(value["payload"]["parameters"]["sample_rate"], 22_050);
        assert_eq!(value["payload"]["parameters"]["volume"], 50);
        // The input object is present even when empty
        assert!(value["payload"]["input"].is_object());
    }

    #[test]
    fn continue_task_envelope_carries_only_the_text() {
        let json = OutboundEnvelope::continue_task("t-2", "hello").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["header"]["action"], "continue-task");
        assert_eq!(value["header"]["task_id"], "t-2");
        assert_eq!(value["payload"]["input"]["text"], "hello");
        assert!(value["payload"].get("model").is_none());
        assert!(value["payload"].get("parameters").is_none());
    }

    #[test]
    fn finish_task_envelope_has_empty_input() {
        let json = OutboundEnvelope::finish_task("t-3").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["header"]["action"], "finish-task");
        assert_eq!(value["payload"]["input"], serde_json::json!({}));
    }

    #[test]
    fn inbound_failure_envelope_parses_error_fields() {
        let envelope = InboundEnvelope::parse(
            r#"{"header":{"event":"task-failed","task_id":"t-4","error_code":"Throttling","error_message":"quota exceeded"}}"#,
        )
        .unwrap();

        assert_eq!(envelope.header.event, "task-failed");
        assert_eq!(envelope.header.error_message.as_deref(), Some("quota exceeded"));
        assert_eq!(envelope.header.error_code.as_deref(), Some("Throttling"));
    }

    #[test]
    fn inbound_parse_failure_is_a_protocol_error() {
        let err = InboundEnvelope::parse("not json").unwrap_err();
        assert!(matches!(err, SynthesisError::Protocol(_)));
    }
}
