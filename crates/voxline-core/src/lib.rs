//! Core domain types for voxline.
//!
//! This crate holds the types shared by every adapter: the synthesis
//! error taxonomy, the voice tunables sent with each task, and the
//! session configuration (endpoint, credential, timing knobs). It has no
//! transport or runtime dependencies; the streaming client lives in
//! `voxline-synth`.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod options;

// Re-export commonly used types for convenience
pub use config::{API_KEY_ENV, DEFAULT_ENDPOINT, SynthConfig, SynthTiming};
pub use error::SynthesisError;
pub use options::{AudioFormat, VoiceOptions};
