//! Run state machine: `Idle → RunStarted → EventInProgress* → RunCompleted | RunFailed`.

use std::fmt;

use tracing::debug;

use rpipe_core::error::AppError;

use crate::contract::LifecycleEvent;

/// State of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Nothing has happened yet.
    Idle,
    /// The trace context exists and the root span is open.
    RunStarted,
    /// Plugins for this event are being invoked.
    EventInProgress(LifecycleEvent),
    /// Every event completed.
    RunCompleted,
    /// An orchestrator-level fault ended the run.
    RunFailed,
}

impl RunState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted | Self::RunFailed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        match (self, next) {
            (Self::Idle, Self::RunStarted) => true,
            (Self::RunStarted | Self::EventInProgress(_), Self::EventInProgress(_)) => true,
            (Self::RunStarted | Self::EventInProgress(_), Self::RunCompleted | Self::RunFailed) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::RunStarted => write!(f, "RunStarted"),
            Self::EventInProgress(event) => write!(f, "EventInProgress({event})"),
            Self::RunCompleted => write!(f, "RunCompleted"),
            Self::RunFailed => write!(f, "RunFailed"),
        }
    }
}

/// Tracks the current state of a run and rejects illegal transitions.
#[derive(Debug)]
pub struct RunTracker {
    trace_id: String,
    state: RunState,
}

impl RunTracker {
    /// Starts in [`RunState::Idle`].
    pub fn new(trace_id: &str) -> Self {
        Self {
            trace_id: trace_id.to_string(),
            state: RunState::Idle,
        }
    }

    /// The current state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Moves to `next`.
    pub fn advance(&mut self, next: RunState) -> Result<(), AppError> {
        if !self.state.can_transition_to(&next) {
            return Err(AppError::internal(format!(
                "illegal run transition {} -> {next}",
                self.state
            )));
        }
        debug!(trace_id = %self.trace_id, from = %self.state, to = %next, "Run state transition");
        self.state = next;
        Ok(())
    }
}
