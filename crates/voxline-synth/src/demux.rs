//! Per-message frame classifier.
//!
//! Every inbound transport message is either an opaque binary audio
//! frame (routed to the sink) or a textual control envelope (routed to
//! the state machine). The classifier holds no state between messages.
//!
//! Textual messages that fail to parse are a protocol error equivalent
//! to a transport failure — a malformed control message is never
//! silently dropped. Well-formed envelopes with an unrecognized event
//! kind are ignored for forward compatibility.

use bytes::Bytes;

use voxline_core::SynthesisError;

use crate::machine::TaskEvent;
use crate::protocol::{InboundEnvelope, event};
use crate::transport::WireMessage;

/// The classification of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// An opaque audio chunk, to be appended to the sink in arrival
    /// order.
    Audio(Bytes),

    /// A recognized control event, to be fed to the state machine.
    Event(TaskEvent),

    /// A well-formed envelope with an event kind this client does not
    /// react to (e.g. `result-generated`). Carries the kind for debug
    /// logging.
    Ignored(String),
}

/// Classify one inbound message.
pub fn classify(message: WireMessage) -> Result<InboundFrame, SynthesisError> {
    match message {
        WireMessage::Binary(data) => Ok(InboundFrame::Audio(data)),
        WireMessage::Text(text) => {
            let envelope = InboundEnvelope::parse(&text)?;
            Ok(match envelope.header.event.as_str() {
                event::TASK_STARTED => InboundFrame::Event(TaskEvent::Started),
                event::TASK_FINISHED => InboundFrame::Event(TaskEvent::Finished),
                event::TASK_FAILED => InboundFrame::Event(TaskEvent::Failed {
                    message: envelope
                        .header
                        .error_message
                        .unwrap_or_else(|| "task failed without a server message".to_string()),
                }),
                _ => InboundFrame::Ignored(envelope.header.event),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frames_are_audio() {
        let frame = classify(WireMessage::Binary(Bytes::from_static(b"\x01\x02"))).unwrap();
        assert_eq!(frame, InboundFrame::Audio(Bytes::from_static(b"\x01\x02")));
    }

    #[test]
    fn lifecycle_events_are_mapped() {
        let started =
            classify(WireMessage::Text(r#"{"header":{"event":"task-started"}}"#.into())).unwrap();
        assert_eq!(started, InboundFrame::Event(TaskEvent::Started));

        let finished =
            classify(WireMessage::Text(r#"{"header":{"event":"task-finished"}}"#.into())).unwrap();
        assert_eq!(finished, InboundFrame::Event(TaskEvent::Finished));
    }

    #[test]
    fn failure_event_carries_server_message() {
        let frame = classify(WireMessage::Text(
            r#"{"header":{"event":"task-failed","error_message":"quota exceeded"}}"#.into(),
        ))
        .unwrap();
        assert_eq!(
            frame,
            InboundFrame::Event(TaskEvent::Failed { message: "quota exceeded".to_string() })
        );
    }

    #[test]
    fn failure_without_message_gets_a_placeholder() {
        let frame =
            classify(WireMessage::Text(r#"{"header":{"event":"task-failed"}}"#.into())).unwrap();
        let InboundFrame::Event(TaskEvent::Failed { message }) = frame else {
            panic!("expected a failure event");
        };
        assert!(!message.is_empty());
    }

    #[test]
    fn unknown_events_are_ignored_not_fatal() {
        let frame = classify(WireMessage::Text(
            r#"{"header":{"event":"result-generated"},"payload":{"usage":{}}}"#.into(),
        ))
        .unwrap();
        assert_eq!(frame, InboundFrame::Ignored("result-generated".to_string()));
    }

    #[test]
    fn malformed_text_is_a_protocol_error() {
        let err = classify(WireMessage::Text("{\"header\":".into())).unwrap_err();
        assert!(matches!(err, SynthesisError::Protocol(_)));

        let err = classify(WireMessage::Text("plain text".into())).unwrap_err();
        assert!(matches!(err, SynthesisError::Protocol(_)));
    }
}
