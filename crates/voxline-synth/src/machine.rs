//! Task lifecycle state machine.
//!
//! One synthesis task moves through:
//!
//! ```text
//!   Idle → Started → Streaming → Finishing → Finished
//!                        │            │
//!                        └────────────┴──→ Failed
//! ```
//!
//! Transitions are a pure function [`step`] from `(state, event)` to the
//! next state plus a list of effects for the driver to apply, so the
//! whole lifecycle is testable without a live transport or real time.
//! Binary audio frames never enter the machine — they are routed
//! straight to the sink and never trigger a transition.

// ── States ─────────────────────────────────────────────────────────

/// Lifecycle phase of one synthesis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created, `run-task` not yet accepted by the transport.
    Idle,

    /// `run-task` accepted by the transport; waiting for the server's
    /// `task-started` acknowledgment. No further commands may be sent.
    Started,

    /// Acknowledged; the text payload has been dispatched and audio
    /// frames may arrive. A deferred `finish-task` is pending.
    Streaming,

    /// `finish-task` dispatched; draining trailing audio until a
    /// terminal event arrives.
    Finishing,

    /// Terminal: the server reported `task-finished`.
    Finished,

    /// Terminal: the server reported `task-failed`, or the transport
    /// died before a terminal event.
    Failed,
}

impl TaskState {
    /// Whether the task has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Inputs to the state machine, in transport arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Server acknowledged the task (`task-started`).
    Started,

    /// Server reported successful completion (`task-finished`).
    Finished,

    /// Server reported failure (`task-failed`), message verbatim.
    Failed { message: String },

    /// The settle delay after the text payload elapsed.
    FinishDelayElapsed,

    /// The connection closed or errored before a terminal event.
    ConnectionLost { reason: String },
}

// ── Effects ────────────────────────────────────────────────────────

/// How a session resolves. Exactly one outcome is produced per task;
/// later terminal-like signals are absorbed by the terminal states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server finished the task; all audio has been delivered.
    Completed,

    /// The server failed the task; carries its message verbatim.
    TaskFailed(String),

    /// The transport died before a terminal event.
    ConnectionLost(String),
}

/// Side effects the driver must apply after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Transmit `continue-task` with the text payload.
    SendContinueTask,

    /// Arm the deferred `finish-task` timer.
    ScheduleFinishTask,

    /// Transmit `finish-task`.
    SendFinishTask,

    /// Resolve the caller's pending result and tear the session down.
    Resolve(SessionOutcome),
}

/// The result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state after the event.
    pub next: TaskState,

    /// Effects to apply, in order. `Resolve` is always last.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: TaskState) -> Self {
        Self { next: state, effects: Vec::new() }
    }

    fn to(next: TaskState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

// ── Transition function ────────────────────────────────────────────

/// Apply one event to one state.
///
/// Terminal states absorb every event: a second terminal-like signal
/// after teardown has begun is a no-op, and a deferred finish firing
/// against a dead task produces no command.
#[must_use]
pub fn step(state: TaskState, event: TaskEvent) -> Transition {
    if state.is_terminal() {
        return Transition::stay(state);
    }

    match (state, event) {
        // Acknowledgment: dispatch the text and arm the deferred finish.
        (TaskState::Started, TaskEvent::Started) => Transition::to(
            TaskState::Streaming,
            vec![Effect::SendContinueTask, Effect::ScheduleFinishTask],
        ),

        // Duplicate acknowledgment, or one before run-task went out:
        // nothing to do, and never a second continue-task.
        (state, TaskEvent::Started) => Transition::stay(state),

        // The settle delay elapsed while the task is live.
        (TaskState::Streaming, TaskEvent::FinishDelayElapsed) => {
            Transition::to(TaskState::Finishing, vec![Effect::SendFinishTask])
        }

        // The timer is only armed in Streaming; anywhere else it is stale.
        (state, TaskEvent::FinishDelayElapsed) => Transition::stay(state),

        // First terminal event wins.
        (_, TaskEvent::Finished) => Transition::to(
            TaskState::Finished,
            vec![Effect::Resolve(SessionOutcome::Completed)],
        ),
        (_, TaskEvent::Failed { message }) => Transition::to(
            TaskState::Failed,
            vec![Effect::Resolve(SessionOutcome::TaskFailed(message))],
        ),
        (_, TaskEvent::ConnectionLost { reason }) => Transition::to(
            TaskState::Failed,
            vec![Effect::Resolve(SessionOutcome::ConnectionLost(reason))],
        ),
    }
}

// ── Stateful wrapper ───────────────────────────────────────────────

/// Owns the current state and applies [`step`] for the session driver.
#[derive(Debug)]
pub struct SessionMachine {
    state: TaskState,
}

impl SessionMachine {
    /// A fresh machine in [`TaskState::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self { state: TaskState::Idle }
    }

    /// Record that the transport accepted the `run-task` command.
    pub fn run_task_sent(&mut self) {
        if self.state == TaskState::Idle {
            self.state = TaskState::Started;
        }
    }

    /// Apply one event and return the effects to perform.
    pub fn handle(&mut self, event: TaskEvent) -> Vec<Effect> {
        let transition = step(self.state, event);
        self.state = transition.next;
        transition.effects
    }

    /// The current lifecycle phase.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}
