//! Synthesis error taxonomy.
//!
//! Every failure of a synthesis session is surfaced to the caller as one
//! of these variants; nothing is retried internally and no variant is
//! fatal to the process. Partial audio already written to the sink is
//! preserved on every failure path — cleanup of partial artifacts is a
//! caller decision.

use std::time::Duration;

/// Errors that can occur while running a synthesis session.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Required credential or identifier missing before a session can
    /// start. Fails fast; no connection attempt is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or structurally invalid control message from the server.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server explicitly reported `task-failed`. Carries the server's
    /// error message verbatim.
    #[error("Synthesis task failed: {0}")]
    TaskFailed(String),

    /// Connection-level failure, or the connection closed before a
    /// terminal task event was observed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The overall session deadline elapsed before the task completed.
    #[error("Session deadline of {0:?} elapsed before the task completed")]
    DeadlineExceeded(Duration),

    /// Writing to or finalizing the audio sink failed.
    #[error("Audio sink error: {0}")]
    Sink(#[from] std::io::Error),
}

impl SynthesisError {
    /// Whether the session failed before any connection was attempted.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_failed_message_is_verbatim() {
        let err = SynthesisError::TaskFailed("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Synthesis task failed: quota exceeded");
    }

    #[test]
    fn io_error_converts_to_sink_variant() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SynthesisError = io.into();
        assert!(matches!(err, SynthesisError::Sink(_)));
    }
}
