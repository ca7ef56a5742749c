//! The session driver: one call, one task, one connection, one sink.
//!
//! [`run_session`] owns the event loop for a single synthesis task. It
//! transmits `run-task`, then reacts to inbound messages one at a time
//! in arrival order: binary frames go straight to the sink, control
//! events go through the state machine, and the machine's effects
//! (dispatch the text, arm the deferred finish, resolve) are applied in
//! order. The loop suspends the caller until the first terminal signal
//! — server success, server failure, transport death, or the overall
//! deadline — and the teardown path below the loop runs unconditionally,
//! so the connection is closed and the sink finalized on every exit.
//!
//! Concurrent sessions are independent: each owns its task identifier,
//! connection, and sink, and shares nothing.

use std::path::Path;
use std::pin::Pin;

use tokio::time::{self, Sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use voxline_core::{SynthConfig, SynthTiming, SynthesisError, VoiceOptions};

use crate::demux::{self, InboundFrame};
use crate::machine::{Effect, SessionMachine, SessionOutcome, TaskEvent};
use crate::protocol::OutboundEnvelope;
use crate::sink::{AudioSink, FileSink, MemorySink};
use crate::transport::{Transport, WireMessage, WsTransport};

// ── Public entry point ─────────────────────────────────────────────

/// Speech-synthesis client bound to one endpoint configuration.
///
/// Cheap to clone-by-construction: every [`synthesize`](Self::synthesize)
/// call opens its own connection and task, so one synthesizer can serve
/// concurrent callers without shared state.
pub struct SpeechSynthesizer {
    config: SynthConfig,
}

impl SpeechSynthesizer {
    /// Build a synthesizer from an explicit configuration.
    #[must_use]
    pub const fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Build a synthesizer from the process environment.
    pub fn from_env() -> Result<Self, SynthesisError> {
        Ok(Self::new(SynthConfig::from_env()?))
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Synthesize `text` into the file at `output`.
    ///
    /// The file is created (truncated) before the connection is opened,
    /// so even an immediate failure yields a valid empty artifact rather
    /// than a stale one. Returns once the sink has been fully written
    /// and finalized, or fails with the session's first error; partial
    /// audio is preserved on failure.
    pub async fn synthesize(
        &self,
        text: &str,
        output: impl AsRef<Path>,
        options: &VoiceOptions,
    ) -> Result<(), SynthesisError> {
        let mut sink = FileSink::create(output.as_ref()).await?;
        match WsTransport::connect(&self.config).await {
            Ok(transport) => {
                run_session(transport, &mut sink, text, options, self.config.timing).await
            }
            Err(e) => {
                if let Err(finalize_err) = sink.finalize().await {
                    warn!(error = %finalize_err, "sink finalize failed after connect error");
                }
                Err(e)
            }
        }
    }

    /// Synthesize `text` and return the audio bytes in memory.
    pub async fn synthesize_to_vec(
        &self,
        text: &str,
        options: &VoiceOptions,
    ) -> Result<Vec<u8>, SynthesisError> {
        let mut sink = MemorySink::new();
        let transport = WsTransport::connect(&self.config).await?;
        run_session(transport, &mut sink, text, options, self.config.timing).await?;
        Ok(sink.into_bytes())
    }
}

// ── Session loop ───────────────────────────────────────────────────

/// Run one synthesis task over an already-established transport.
///
/// Public with injectable transport and sink so callers and tests can
/// substitute scripted doubles for the live connection. The sink is
/// borrowed rather than consumed so the caller can still inspect
/// partial output after a failure.
///
/// Teardown — closing the transport and finalizing the sink — happens
/// on every exit path, including the overall deadline.
pub async fn run_session<T, S>(
    mut transport: T,
    sink: &mut S,
    text: &str,
    options: &VoiceOptions,
    timing: SynthTiming,
) -> Result<(), SynthesisError>
where
    T: Transport,
    S: AudioSink,
{
    let task_id = Uuid::new_v4().to_string();

    let result = tokio::select! {
        outcome = drive(&mut transport, sink, &task_id, text, options, timing) => outcome,
        () = time::sleep(timing.session_deadline) => {
            warn!(%task_id, deadline = ?timing.session_deadline, "session deadline elapsed");
            Err(SynthesisError::DeadlineExceeded(timing.session_deadline))
        }
    };

    // Unconditional teardown: the connection and the sink are released
    // on success, failure, and deadline alike.
    transport.close().await;
    let finalized = sink.finalize().await;

    match (result, finalized) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(finalize_err)) => Err(finalize_err.into()),
        // The session outcome wins; a finalize error on top of it is
        // only worth a log line.
        (Err(session_err), finalized) => {
            if let Err(finalize_err) = finalized {
                warn!(error = %finalize_err, "sink finalize failed during teardown");
            }
            Err(session_err)
        }
    }
}

/// The event loop proper. Returns on the first terminal signal.
async fn drive<T, S>(
    transport: &mut T,
    sink: &mut S,
    task_id: &str,
    text: &str,
    options: &VoiceOptions,
    timing: SynthTiming,
) -> Result<(), SynthesisError>
where
    T: Transport,
    S: AudioSink,
{
    let mut machine = SessionMachine::new();

    let run = OutboundEnvelope::run_task(task_id, options).to_json()?;
    transport.send(WireMessage::Text(run)).await?;
    machine.run_task_sent();
    info!(task_id, model = %options.model, voice = %options.voice, "run-task dispatched");

    // Armed by Effect::ScheduleFinishTask; the machine suppresses a
    // stale expiry against a task that already reached a terminal state.
    let mut finish_timer: Option<Pin<Box<Sleep>>> = None;

    loop {
        let event = tokio::select! {
            () = wait_for(&mut finish_timer) => {
                finish_timer = None;
                TaskEvent::FinishDelayElapsed
            }
            message = transport.next_message() => match message {
                Some(Ok(message)) => match demux::classify(message)? {
                    InboundFrame::Audio(frame) => {
                        // Frames never touch the state machine: append in
                        // arrival order and keep reading.
                        debug!(task_id, bytes = frame.len(), "audio frame");
                        sink.append(&frame).await?;
                        continue;
                    }
                    InboundFrame::Event(event) => event,
                    InboundFrame::Ignored(kind) => {
                        debug!(task_id, event = %kind, "ignoring control event");
                        continue;
                    }
                },
                Some(Err(e)) => return Err(e),
                None => TaskEvent::ConnectionLost {
                    reason: "connection closed before the task completed".to_string(),
                },
            },
        };

        for effect in machine.handle(event) {
            match effect {
                Effect::SendContinueTask => {
                    let envelope = OutboundEnvelope::continue_task(task_id, text).to_json()?;
                    transport.send(WireMessage::Text(envelope)).await?;
                    debug!(task_id, chars = text.chars().count(), "continue-task dispatched");
                }
                Effect::ScheduleFinishTask => {
                    finish_timer = Some(Box::pin(time::sleep(timing.finish_settle_delay)));
                }
                Effect::SendFinishTask => {
                    let envelope = OutboundEnvelope::finish_task(task_id).to_json()?;
                    transport.send(WireMessage::Text(envelope)).await?;
                    debug!(task_id, "finish-task dispatched");
                }
                Effect::Resolve(outcome) => {
                    return match outcome {
                        SessionOutcome::Completed => {
                            info!(task_id, "task finished");
                            Ok(())
                        }
                        SessionOutcome::TaskFailed(message) => {
                            warn!(task_id, error = %message, "task failed");
                            Err(SynthesisError::TaskFailed(message))
                        }
                        SessionOutcome::ConnectionLost(reason) => {
                            warn!(task_id, %reason, "transport lost");
                            Err(SynthesisError::Transport(reason))
                        }
                    };
                }
            }
        }
    }
}

/// Await the deferred-finish timer, or park forever while it is unarmed
/// so the other select arms keep the loop alive.
async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}
