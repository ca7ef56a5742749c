//! Duplex streaming speech-synthesis session client.
//!
//! One call to [`SpeechSynthesizer::synthesize`] drives one server-side
//! synthesis task over a persistent bidirectional WebSocket connection,
//! multiplexing JSON control events with opaque binary audio frames and
//! streaming partial audio to a sink as it arrives.
//!
//! ## Protocol
//!
//! | Direction | Frame | Meaning |
//! |---|---|---|
//! | Client → Server | Text `run-task` | open a synthesis task |
//! | Server → Client | Text `task-started` | task acknowledged |
//! | Client → Server | Text `continue-task` | the text payload |
//! | Server → Client | Binary, variable | synthesized audio chunk |
//! | Client → Server | Text `finish-task` | no more input (after a settle delay) |
//! | Server → Client | Text `task-finished` / `task-failed` | terminal event |
//!
//! The task lifecycle is an explicit state machine
//! ([`machine`]) whose transitions are a pure function, driven by a
//! per-message classifier ([`demux`]) and a session loop ([`session`])
//! that guarantees the audio sink is finalized on every exit path.

#![deny(unused_crate_dependencies)]

pub mod demux;
pub mod machine;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod transport;

// Re-export key types for convenience
pub use session::{SpeechSynthesizer, run_session};
pub use sink::{AudioSink, FileSink, MemorySink};
pub use transport::{Transport, WireMessage, WsTransport};
pub use voxline_core::{AudioFormat, SynthConfig, SynthTiming, SynthesisError, VoiceOptions};
